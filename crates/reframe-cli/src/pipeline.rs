//! The `run` command: probe, extract, render and encode one video, timing
//! each stage into the metrics log.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use reframe_core::{GpuBackend, RenderStrategy, ReframeConfig, VideoInfo};
use reframe_encode::FfmpegEncoder;
use reframe_render::{ComputeDevice, Dispatcher, EmulatedDevice, GpuDevice, RenderSummary};

use crate::metrics::{count_files, MetricsLog, StageRecord};

/// Render every frame in `input` into `output`, picking the compute device
/// from `config.gpu.backend` when the strategy needs one.
pub fn render_dir(
    config: &ReframeConfig,
    input: &Path,
    output: &Path,
    strategy: RenderStrategy,
) -> Result<RenderSummary> {
    if strategy != RenderStrategy::Gpu {
        let summary = Dispatcher::new(config.clone()).render_dir(input, output, strategy)?;
        return Ok(summary);
    }

    match config.gpu.backend {
        GpuBackend::Wgpu => {
            let device =
                GpuDevice::init().context("no usable GPU adapter (try --backend emulated)")?;
            render_on(Dispatcher::with_device(config.clone(), device), input, output, strategy)
        }
        GpuBackend::Emulated => {
            let device = EmulatedDevice::new(config.gpu.lanes);
            render_on(Dispatcher::with_device(config.clone(), device), input, output, strategy)
        }
    }
}

fn render_on<D: ComputeDevice>(
    dispatcher: Dispatcher<D>,
    input: &Path,
    output: &Path,
    strategy: RenderStrategy,
) -> Result<RenderSummary> {
    if let Some(device) = dispatcher.device() {
        tracing::info!("Compute device: {}", device.name());
    }
    Ok(dispatcher.render_dir(input, output, strategy)?)
}

/// Working directories of one run.
struct WorkDirs {
    root: PathBuf,
    extracts: PathBuf,
    renders: PathBuf,
}

impl WorkDirs {
    fn new(config: &ReframeConfig, info: &VideoInfo) -> Self {
        let root = config
            .pipeline
            .work_dir
            .join(format!("{}_{}", info.name, std::process::id()));
        Self {
            extracts: root.join("extracts"),
            renders: root.join("renders"),
            root,
        }
    }

    fn remove(&self) {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::info!("Removed working directory {}", self.root.display()),
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.root.display(), e),
        }
    }
}

/// Run the full pipeline on `video` and return the path of the encoded result.
pub fn run(
    config: &ReframeConfig,
    video: &Path,
    strategy: RenderStrategy,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let info = reframe_encode::probe(video)?;
    let output =
        output.unwrap_or_else(|| PathBuf::from("output").join(format!("{}.mp4", info.name)));
    let dirs = WorkDirs::new(config, &info);

    let result = run_stages(config, video, strategy, &info, &dirs, &output);

    if config.pipeline.keep_temp {
        tracing::info!("Keeping working directory {}", dirs.root.display());
    } else {
        dirs.remove();
    }
    result.map(|()| output)
}

fn run_stages(
    config: &ReframeConfig,
    video: &Path,
    strategy: RenderStrategy,
    info: &VideoInfo,
    dirs: &WorkDirs,
    output: &Path,
) -> Result<()> {
    let metrics = MetricsLog::new(&config.pipeline.metrics_path);
    let file_name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = |operation: &str, setup: &str, start: Instant, dir: &Path| StageRecord {
        operation: operation.to_string(),
        setup: setup.to_string(),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        frames: count_files(dir),
        resolution: info.resolution(),
        file_name: file_name.clone(),
    };

    println!("   Extracting frames...");
    let start = Instant::now();
    FfmpegEncoder::extract_frames(video, &dirs.extracts, &config.frames)?;
    metrics.append(&record("Extracting images", "-", start, dirs.extracts.as_path()))?;

    println!("   Rendering frames ({})...", strategy);
    let start = Instant::now();
    let summary = render_dir(config, &dirs.extracts, &dirs.renders, strategy)?;
    metrics.append(&record(
        "Re-rendering images",
        strategy.as_str(),
        start,
        dirs.renders.as_path(),
    ))?;
    if !summary.is_complete() {
        tracing::warn!(
            "{} of {} frames were not rendered",
            summary.frames - summary.processed,
            summary.frames
        );
    }

    println!("   Encoding video...");
    let start = Instant::now();
    FfmpegEncoder::encode_sequence(&dirs.renders, &config.frames, info, output)
        .with_context(|| format!("failed to encode {}", output.display()))?;
    metrics.append(&record("Re-rendering video", "-", start, dirs.renders.as_path()))?;

    Ok(())
}
