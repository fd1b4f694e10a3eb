//! Round-robin chunk partitioning of an ordered frame list.

use reframe_core::{ReframeError, ReframeResult};

/// Split `items` into `chunk_count` chunks: item `i` goes to chunk
/// `i % chunk_count`.
///
/// Relative order is preserved inside each chunk and chunk sizes differ by at
/// most one. Chunks are empty when there are more chunks than items.
pub fn partition<T>(items: &[T], chunk_count: usize) -> ReframeResult<Vec<Vec<&T>>> {
    if chunk_count == 0 {
        return Err(ReframeError::InvalidArgument(
            "chunk count must be at least 1".into(),
        ));
    }

    let (base, extra) = (items.len() / chunk_count, items.len() % chunk_count);
    let mut chunks: Vec<Vec<&T>> = (0..chunk_count)
        .map(|c| Vec::with_capacity(base + usize::from(c < extra)))
        .collect();
    for (i, item) in items.iter().enumerate() {
        chunks[i % chunk_count].push(item);
    }
    Ok(chunks)
}

/// Inverse of [`partition`]: read the chunks positionally, round-robin.
pub fn merge_round_robin<'a, T>(chunks: &[Vec<&'a T>]) -> Vec<&'a T> {
    let total = chunks.iter().map(Vec::len).sum();
    let longest = chunks.iter().map(Vec::len).max().unwrap_or(0);
    let mut merged = Vec::with_capacity(total);
    for position in 0..longest {
        for chunk in chunks {
            if let Some(item) = chunk.get(position) {
                merged.push(*item);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_assignment() {
        let ids: Vec<u64> = (0..7).collect();
        let chunks = partition(&ids, 3).unwrap();
        let as_values: Vec<Vec<u64>> = chunks
            .iter()
            .map(|c| c.iter().map(|v| **v).collect())
            .collect();
        assert_eq!(as_values, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn test_partition_merge_is_identity() {
        for len in 0..40usize {
            let ids: Vec<u64> = (0..len as u64).collect();
            for n in 1..12usize {
                let chunks = partition(&ids, n).unwrap();
                assert_eq!(chunks.len(), n);

                let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
                let min = sizes.iter().min().copied().unwrap_or(0);
                let max = sizes.iter().max().copied().unwrap_or(0);
                assert!(max - min <= 1, "len={} n={} sizes={:?}", len, n, sizes);

                let merged: Vec<u64> = merge_round_robin(&chunks).into_iter().copied().collect();
                assert_eq!(merged, ids, "len={} n={}", len, n);
            }
        }
    }

    #[test]
    fn test_empty_input_gives_empty_chunks() {
        let ids: Vec<u64> = Vec::new();
        let chunks = partition(&ids, 4).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_more_workers_than_frames() {
        let ids: Vec<u64> = vec![0, 1, 2];
        let chunks = partition(&ids, 8).unwrap();
        let non_empty: Vec<&Vec<&u64>> = chunks.iter().filter(|c| !c.is_empty()).collect();
        assert_eq!(non_empty.len(), 3);
        assert!(non_empty.iter().all(|c| c.len() == 1));
        assert_eq!(chunks.iter().filter(|c| c.is_empty()).count(), 5);
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let ids: Vec<u64> = vec![0];
        assert!(matches!(
            partition(&ids, 0),
            Err(ReframeError::InvalidArgument(_))
        ));
    }
}
