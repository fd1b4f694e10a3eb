//! Runs the WGSL kernel on a real adapter. Skipped on machines without one.

mod common;

use common::*;
use reframe_core::GpuConfig;
use reframe_render::shader::shade_pixel;
use reframe_render::{
    CancelToken, ComputeDevice, ComputeSession, GpuDevice, GpuExecutor, KernelProgram,
};

fn device() -> Option<GpuDevice> {
    match GpuDevice::init() {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("skipping wgpu test: {}", e);
            None
        }
    }
}

#[test]
fn test_kernel_matches_host_for_every_byte() {
    let Some(device) = device() else { return };
    let session = match device.open_session(&KernelProgram::pixel_shader(), 0) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("skipping wgpu test: {}", e);
            return;
        }
    };

    // 256 pixels, one per byte value; alpha runs the other way.
    let input: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v, 255 - v]).collect();
    let buffer = session.upload(&input).unwrap();
    session.execute(&buffer, 16, 16).unwrap();
    let output = session.download(&buffer).unwrap();

    for (v, px) in output.chunks_exact(4).enumerate() {
        let v = v as u8;
        assert_eq!(px, shade_pixel([v, v, v, 255 - v]).as_slice(), "byte value {}", v);
    }
}

#[test]
fn test_pinned_lane_counts_cover_every_pixel_once() {
    let Some(device) = device() else { return };

    // 7x3 is not a multiple of four pixels; a second pass would double the
    // channels of some pixel.
    let input: Vec<u8> = (0..21u8).flat_map(|v| [v, v, v, v]).collect();
    for lanes in [1, 2, 5, 64, 100] {
        let session = device
            .open_session(&KernelProgram::pixel_shader(), lanes)
            .unwrap();
        let buffer = session.upload(&input).unwrap();
        session.execute(&buffer, 7, 3).unwrap();
        let output = session.download(&buffer).unwrap();
        for (v, px) in output.chunks_exact(4).enumerate() {
            let v = v as u8;
            assert_eq!(px, shade_pixel([v, v, v, v]).as_slice(), "{} lanes", lanes);
        }
    }
}

#[test]
fn test_missing_entry_point_fails_to_build() {
    let Some(device) = device() else { return };
    let program = KernelProgram::new(reframe_render::kernel::KERNEL_SOURCE, "apply_blur");
    assert!(device.open_session(&program, 0).is_err());
}

#[test]
fn test_executor_on_adapter_never_mixes_frames() {
    let Some(device) = device() else { return };
    let root = scratch_dir("wgpu_stress");
    let input = root.join("in");
    std::fs::create_dir_all(&input).unwrap();
    let frames = write_frames(&input, 64);

    for lanes in [0, 3] {
        for workers in [1, 4, 16] {
            let out = root.join(format!("out_{}_{}", lanes, workers));
            std::fs::create_dir_all(&out).unwrap();
            let config = GpuConfig {
                lanes,
                ..GpuConfig::default()
            };

            let summary = GpuExecutor::new(&device, &config)
                .render(&frames, &out, workers, &CancelToken::new())
                .unwrap();

            assert_eq!(summary.processed, 64, "lanes={} workers={}", lanes, workers);
            assert_eq!(summary.failed, 0, "lanes={} workers={}", lanes, workers);
            assert_outputs_match(&frames, &out);
        }
    }
}

#[test]
fn test_transfers_overlap_kernel_execution() {
    let Some(device) = device() else { return };
    let session = device
        .open_session(&KernelProgram::pixel_shader(), 0)
        .unwrap();

    std::thread::scope(|s| {
        let session = &session;
        for t in 0..4u8 {
            s.spawn(move || {
                for round in 0..16u8 {
                    let input = vec![t.wrapping_add(round); 64 * 4];
                    let buffer = session.upload(&input).unwrap();
                    assert_eq!(session.download(&buffer).unwrap(), input);
                }
            });
        }

        let input: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v, v]).collect();
        for _ in 0..16 {
            let buffer = session.upload(&input).unwrap();
            session.execute(&buffer, 16, 16).unwrap();
            let output = session.download(&buffer).unwrap();
            for (v, px) in output.chunks_exact(4).enumerate() {
                let v = v as u8;
                assert_eq!(px, shade_pixel([v, v, v, v]).as_slice());
            }
        }
    });
}
