//! The compute kernel: its WGSL source, launch geometry, and the host mirror
//! of its lane mapping used by the emulated backend.

use std::borrow::Cow;

/// WGSL source of the pixel shader kernel.
pub const KERNEL_SOURCE: &str = include_str!("kernel.wgsl");
/// Entry point of [`KERNEL_SOURCE`].
pub const ENTRY_POINT: &str = "apply_shader";
/// Must match `@workgroup_size` in the WGSL source.
pub const WORKGROUP_SIZE: u32 = 64;
/// Consecutive pixels a lane processes per step.
pub const PIXELS_PER_STEP: u32 = 4;
/// Per-dimension dispatch limit guaranteed by every wgpu backend.
pub const MAX_WORKGROUPS: u32 = 65_535;

/// Kernel source text plus the entry point to create the kernel from.
#[derive(Debug, Clone)]
pub struct KernelProgram {
    source: Cow<'static, str>,
    entry_point: Cow<'static, str>,
}

impl KernelProgram {
    pub fn new(
        source: impl Into<Cow<'static, str>>,
        entry_point: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            source: source.into(),
            entry_point: entry_point.into(),
        }
    }

    /// The one kernel this engine runs.
    pub fn pixel_shader() -> Self {
        Self::new(KERNEL_SOURCE, ENTRY_POINT)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Whether the source declares a function named after the entry point.
    pub fn declares_entry_point(&self) -> bool {
        self.source.contains(&format!("fn {}(", self.entry_point))
    }
}

/// Lanes to launch for a frame of `pixel_count` pixels.
///
/// `configured > 0` pins the lane count; otherwise one lane per
/// [`PIXELS_PER_STEP`] pixels, capped at the dispatch limit. The launch is
/// rounded up to whole workgroups and the kernel masks the extra invocations.
pub fn lane_count(pixel_count: usize, configured: u32) -> u32 {
    if configured > 0 {
        return configured.min(MAX_WORKGROUPS * WORKGROUP_SIZE);
    }
    let steps = pixel_count.div_ceil(PIXELS_PER_STEP as usize).max(1);
    steps.min((MAX_WORKGROUPS * WORKGROUP_SIZE) as usize) as u32
}

/// Workgroups needed to launch at least `lanes` lanes.
pub fn workgroup_count(lanes: u32) -> u32 {
    lanes.div_ceil(WORKGROUP_SIZE).clamp(1, MAX_WORKGROUPS)
}

/// Pixel indices visited by `lane` out of `lanes`, in visiting order.
pub fn lane_pixels(lane: u32, lanes: u32, pixel_count: usize) -> impl Iterator<Item = usize> {
    let step = PIXELS_PER_STEP as usize;
    let stride = (lanes.max(1) as usize) * step;
    (lane as usize * step..pixel_count)
        .step_by(stride)
        .flat_map(move |base| base..(base + step).min(pixel_count))
}

/// Host mirror of the WGSL `shade` function on one packed pixel word.
pub fn shade_word(px: u32) -> u32 {
    let r = ((px & 0xff) * 2) & 0xff;
    let g = (((px >> 8) & 0xff) * 3) & 0xff;
    let b = (((px >> 16) & 0xff) * 4) & 0xff;
    let a = px & 0xff00_0000;
    r | (g << 8) | (b << 16) | a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::shade_pixel;

    #[test]
    fn test_kernel_source_declares_entry_point() {
        let program = KernelProgram::pixel_shader();
        assert!(program.declares_entry_point());
        assert!(program.source().contains("@workgroup_size(64)"));
    }

    #[test]
    fn test_missing_entry_point_detected() {
        let program = KernelProgram::new(KERNEL_SOURCE, "apply_blur");
        assert!(!program.declares_entry_point());
    }

    #[test]
    fn test_shade_word_matches_host_transform_exhaustively() {
        for v in 0..=255u8 {
            for channel in 0..4 {
                let mut px = [0u8; 4];
                px[channel] = v;
                let word = u32::from_le_bytes(px);
                assert_eq!(
                    shade_word(word).to_le_bytes(),
                    shade_pixel(px),
                    "channel {} value {}",
                    channel,
                    v
                );
            }
        }
    }

    #[test]
    fn test_lane_mapping_covers_every_pixel_once() {
        for pixel_count in [0usize, 1, 3, 4, 5, 17, 64, 257, 1000] {
            for lanes in [1u32, 2, 3, 7, 64, 300] {
                let mut hits = vec![0u32; pixel_count];
                for lane in 0..lanes {
                    for p in lane_pixels(lane, lanes, pixel_count) {
                        hits[p] += 1;
                    }
                }
                assert!(
                    hits.iter().all(|&h| h == 1),
                    "pixels={} lanes={}",
                    pixel_count,
                    lanes
                );
            }
        }
    }

    #[test]
    fn test_lane_stride_is_lanes_times_four() {
        let visited: Vec<usize> = lane_pixels(1, 3, 40).collect();
        assert_eq!(visited, vec![4, 5, 6, 7, 16, 17, 18, 19, 28, 29, 30, 31]);
    }

    #[test]
    fn test_lane_count_auto_and_pinned() {
        assert_eq!(lane_count(0, 0), 1);
        assert_eq!(lane_count(4, 0), 1);
        assert_eq!(lane_count(5, 0), 2);
        assert_eq!(lane_count(1920 * 1080, 0), 1920 * 1080 / 4);
        assert_eq!(lane_count(1920 * 1080, 32), 32);
    }

    #[test]
    fn test_workgroup_count() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(u32::MAX), MAX_WORKGROUPS);
    }
}
