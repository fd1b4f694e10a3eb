//! Image loading and saving.
//! Decodes PNG, JPEG, BMP and other formats into FrameBuffers and writes
//! FrameBuffers back out, choosing the encoder from the file extension.

use std::path::{Path, PathBuf};

use reframe_core::frame::FrameBuffer;
use reframe_core::ReframeError;

/// Load an image file and convert it to an RGBA FrameBuffer.
pub fn load_image(path: &Path) -> Result<FrameBuffer, ReframeError> {
    let img = image::open(path).map_err(|e| {
        ReframeError::asset(
            format!("failed to load image '{}': {}", path.display(), e),
            path,
        )
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_rgba(width, height, rgba.into_raw())
}

/// Write a FrameBuffer to `path`.
///
/// The image is encoded into a sibling temporary file and renamed into place,
/// so a failed write never leaves a truncated frame behind.
pub fn save_image(fb: &FrameBuffer, path: &Path) -> Result<(), ReframeError> {
    let format = image::ImageFormat::from_path(path).map_err(|e| {
        ReframeError::asset(format!("unsupported output format: {}", e), path)
    })?;
    let img = image::RgbaImage::from_raw(fb.width, fb.height, fb.data.clone()).ok_or_else(|| {
        ReframeError::asset("pixel buffer does not match frame dimensions", path)
    })?;

    let staging = staging_path(path);
    if let Err(e) = img.save_with_format(&staging, format) {
        let _ = std::fs::remove_file(&staging);
        return Err(ReframeError::asset(
            format!("failed to write image '{}': {}", path.display(), e),
            path,
        ));
    }
    std::fs::rename(&staging, path).map_err(|e| {
        let _ = std::fs::remove_file(&staging);
        ReframeError::asset(format!("failed to move image into place: {}", e), path)
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
