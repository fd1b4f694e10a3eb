use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ReframeError, ReframeResult};

/// Bytes per pixel of every frame buffer (8-bit RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// A single video frame as a raw RGBA8 pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
        Self {
            data: vec![0u8; size],
            width,
            height,
        }
    }

    /// Wrap existing RGBA bytes. Fails if the length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> ReframeResult<Self> {
        let expected = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(ReframeError::InvalidArgument(format!(
                "pixel buffer has {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a frame buffer from a list of pixels in row-major order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> ReframeResult<Self> {
        let data = pixels.iter().flat_map(|p| p.iter().copied()).collect();
        Self::from_rgba(width, height, data)
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * BYTES_PER_PIXEL;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * BYTES_PER_PIXEL;
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Identity of a frame in a video: its zero-based ordinal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Zero-based frame index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", self.index)
    }
}

/// A frame identity together with the image file holding its pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameRef {
    pub frame: Frame,
    pub path: PathBuf,
}

impl FrameRef {
    pub fn new(index: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            frame: Frame::new(index),
            path: path.into(),
        }
    }

    pub fn index(&self) -> u64 {
        self.frame.index
    }

    /// Where this frame's output lands inside `output_dir`: the same file name.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        match self.path.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.join(format!("frame_{}.png", self.frame.index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(1920, 1080);
        assert_eq!(fb.width, 1920);
        assert_eq!(fb.height, 1080);
        assert_eq!(fb.byte_size(), 1920 * 1080 * 4);
        assert_eq!(fb.pixel_count(), 1920 * 1080);
    }

    #[test]
    fn test_frame_buffer_get_set_pixel() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
    }

    #[test]
    fn test_frame_buffer_out_of_bounds() {
        let fb = FrameBuffer::new(10, 10);
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_from_rgba_length_mismatch() {
        let result = FrameBuffer::from_rgba(2, 2, vec![0u8; 15]);
        assert!(matches!(result, Err(ReframeError::InvalidArgument(_))));
    }

    #[test]
    fn test_from_pixels_row_major() {
        let fb = FrameBuffer::from_pixels(2, 1, &[[1, 2, 3, 4], [5, 6, 7, 8]]).unwrap();
        assert_eq!(fb.get_pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(fb.pixels().count(), 2);
    }

    #[test]
    fn test_output_path_keeps_file_name() {
        let frame = FrameRef::new(12, "/in/frame_12.png");
        assert_eq!(
            frame.output_path(Path::new("/out")),
            PathBuf::from("/out/frame_12.png")
        );
    }
}
