//! The pixel shader: the per-pixel effect applied to every frame.
//!
//! Red is doubled, green tripled and blue quadrupled, each wrapping modulo
//! 256; alpha passes through. The compute kernel in `kernel.wgsl` implements
//! the same arithmetic and must agree with [`shade_pixel`] for every byte.

use reframe_core::frame::{FrameBuffer, BYTES_PER_PIXEL};

/// Apply the shader to one RGBA pixel.
#[inline]
pub fn shade_pixel(px: [u8; 4]) -> [u8; 4] {
    [
        px[0].wrapping_mul(2),
        px[1].wrapping_mul(3),
        px[2].wrapping_mul(4),
        px[3],
    ]
}

/// Apply the shader to every pixel of `src`, producing a new frame.
pub fn apply_shader(src: &FrameBuffer) -> FrameBuffer {
    let mut out = src.clone();
    for px in out.data.chunks_exact_mut(BYTES_PER_PIXEL) {
        let shaded = shade_pixel([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&shaded);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_pixel_wraps() {
        assert_eq!(shade_pixel([200, 200, 200, 0]), [144, 88, 32, 0]);
        assert_eq!(shade_pixel([255, 255, 255, 255]), [254, 253, 252, 255]);
        assert_eq!(shade_pixel([0, 0, 0, 7]), [0, 0, 0, 7]);
    }

    #[test]
    fn test_alpha_is_identity() {
        for a in 0..=255u8 {
            assert_eq!(shade_pixel([1, 1, 1, a])[3], a);
        }
    }

    #[test]
    fn test_apply_shader_reference_frame() {
        let src = FrameBuffer::from_pixels(
            2,
            2,
            &[
                [10, 10, 10, 255],
                [100, 50, 25, 255],
                [200, 200, 200, 0],
                [1, 2, 3, 4],
            ],
        )
        .unwrap();
        let out = apply_shader(&src);
        let pixels: Vec<[u8; 4]> = out.pixels().collect();
        assert_eq!(
            pixels,
            vec![
                [20, 30, 40, 255],
                [200, 150, 100, 255],
                [144, 88, 32, 0],
                [2, 6, 12, 4],
            ]
        );
        // the source frame is left untouched
        assert_eq!(src.get_pixel(0, 0), Some([10, 10, 10, 255]));
    }
}
