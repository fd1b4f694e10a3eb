//! CPU executors: one frame at a time, or round-robin chunks on a worker pool.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use reframe_core::{FrameRef, RenderStrategy, ReframeError, ReframeResult};

use crate::cancel::CancelToken;
use crate::image_loader::{load_image, save_image};
use crate::partition::partition;
use crate::shader::apply_shader;
use crate::summary::{FrameTally, RenderSummary};

/// Load one frame, shade it and write it under the same file name in `output_dir`.
pub fn render_frame(frame: &FrameRef, output_dir: &Path) -> ReframeResult<()> {
    let src = load_image(&frame.path)?;
    let out = apply_shader(&src);
    save_image(&out, &frame.output_path(output_dir))
}

/// Render every frame in index order on the calling thread.
pub fn render_sequential(
    frames: &[FrameRef],
    output_dir: &Path,
    cancel: &CancelToken,
) -> RenderSummary {
    let start = Instant::now();
    let tally = FrameTally::default();

    for frame in frames {
        if cancel.is_cancelled() {
            tally.record_cancelled();
            continue;
        }
        tally.record(frame, render_frame(frame, output_dir));
    }

    tally.into_summary(RenderStrategy::Sequential, frames.len(), 1, start.elapsed())
}

/// Render the frames as `workers` round-robin chunks, one chunk per worker.
///
/// Returns once every chunk is done. A failing frame only affects itself.
pub fn render_parallel(
    frames: &[FrameRef],
    output_dir: &Path,
    workers: usize,
    cancel: &CancelToken,
) -> ReframeResult<RenderSummary> {
    let start = Instant::now();
    let chunks = partition(frames, workers)?;
    tracing::info!(
        "Rendering {} frames in {} chunks on the CPU",
        frames.len(),
        chunks.len()
    );

    let pool = worker_pool(workers)?;
    let tally = FrameTally::default();
    pool.install(|| {
        chunks.par_iter().for_each(|chunk| {
            for frame in chunk {
                if cancel.is_cancelled() {
                    tally.record_cancelled();
                    continue;
                }
                tally.record(frame, render_frame(frame, output_dir));
            }
        });
    });

    Ok(tally.into_summary(
        RenderStrategy::ParallelCpu,
        frames.len(),
        workers,
        start.elapsed(),
    ))
}

/// A dedicated pool with exactly `workers` threads.
pub(crate) fn worker_pool(workers: usize) -> ReframeResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("reframe-worker-{}", i))
        .build()
        .map_err(|e| ReframeError::Render(format!("failed to start worker pool: {}", e)))
}
