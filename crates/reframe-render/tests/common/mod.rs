//! Shared fixtures for the render integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use reframe_core::hash::hash_frame;
use reframe_core::{FrameBuffer, FrameRef};
use reframe_render::image_loader::{load_image, save_image};
use reframe_render::shader::apply_shader;

pub const REFERENCE_INPUT: [[u8; 4]; 4] = [
    [10, 10, 10, 255],
    [100, 50, 25, 255],
    [200, 200, 200, 0],
    [1, 2, 3, 4],
];

pub const REFERENCE_OUTPUT: [[u8; 4]; 4] = [
    [20, 30, 40, 255],
    [200, 150, 100, 255],
    [144, 88, 32, 0],
    [2, 6, 12, 4],
];

/// A fresh, empty directory unique to this test process.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reframe_it_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Deterministic frame contents; size and pixels both depend on the index so
/// a result landing in the wrong frame is detectable.
pub fn test_frame(index: u64) -> FrameBuffer {
    let width = 3 + (index % 5) as u32;
    let height = 2 + (index % 3) as u32;
    let mut fb = FrameBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let seed = (index as u32).wrapping_mul(31) ^ (x * 7 + y * 13);
            fb.set_pixel(
                x,
                y,
                [seed as u8, (seed >> 3) as u8, seed.wrapping_mul(5) as u8, !seed as u8],
            );
        }
    }
    fb
}

/// Write `count` frames named `frame_<i>.png` into `dir`.
pub fn write_frames(dir: &Path, count: u64) -> Vec<FrameRef> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("frame_{}.png", i));
            save_image(&test_frame(i), &path).unwrap();
            FrameRef::new(i, path)
        })
        .collect()
}

/// Assert every input has an output equal to the host transform of that input.
pub fn assert_outputs_match(frames: &[FrameRef], output_dir: &Path) {
    for frame in frames {
        let expected = apply_shader(&load_image(&frame.path).unwrap());
        let actual = load_image(&frame.output_path(output_dir)).unwrap();
        assert_eq!(
            hash_frame(&actual),
            hash_frame(&expected),
            "frame {} does not match its transform",
            frame.index()
        );
    }
}

pub fn output_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
