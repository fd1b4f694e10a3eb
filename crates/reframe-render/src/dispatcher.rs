//! The entry point the application talks to: picks the executor for a
//! render strategy and runs it over a frame sequence.

use std::path::Path;

use reframe_core::{FrameRef, ReframeConfig, RenderStrategy, ReframeError, ReframeResult};

use crate::cancel::CancelToken;
use crate::compute::ComputeDevice;
use crate::cpu::{render_parallel, render_sequential};
use crate::gpu::GpuDevice;
use crate::gpu_executor::GpuExecutor;
use crate::summary::RenderSummary;
use crate::verify::verify_outputs;

/// Renders frame sequences with a configured strategy.
///
/// The compute device is optional: a dispatcher without one still serves
/// the CPU strategies and rejects [`RenderStrategy::Gpu`].
pub struct Dispatcher<D: ComputeDevice = GpuDevice> {
    config: ReframeConfig,
    device: Option<D>,
    cancel: CancelToken,
}

impl Dispatcher {
    /// A CPU-only dispatcher.
    pub fn new(config: ReframeConfig) -> Self {
        Self {
            config,
            device: None,
            cancel: CancelToken::new(),
        }
    }
}

impl<D: ComputeDevice> Dispatcher<D> {
    pub fn with_device(config: ReframeConfig, device: D) -> Self {
        Self {
            config,
            device: Some(device),
            cancel: CancelToken::new(),
        }
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    /// A handle that stops the current and every later run of this dispatcher.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Transform `frames` into `output_dir` (created if missing).
    ///
    /// Per-frame failures are counted in the summary. Errors are reserved for
    /// bad arguments, an unusable output directory, GPU setup failure,
    /// verification mismatches and runs cancelled before they start.
    pub fn render(
        &self,
        frames: &[FrameRef],
        output_dir: &Path,
        strategy: RenderStrategy,
    ) -> ReframeResult<RenderSummary> {
        if self.cancel.is_cancelled() {
            return Err(ReframeError::Cancelled);
        }
        std::fs::create_dir_all(output_dir).map_err(|e| {
            ReframeError::asset(format!("failed to create output directory: {}", e), output_dir)
        })?;

        let workers = self.config.render.worker_count();
        tracing::info!(
            "Rendering {} frames with the {} strategy into {}",
            frames.len(),
            strategy,
            output_dir.display()
        );

        let summary = match strategy {
            RenderStrategy::Sequential => render_sequential(frames, output_dir, &self.cancel),
            RenderStrategy::ParallelCpu => {
                render_parallel(frames, output_dir, workers, &self.cancel)?
            }
            RenderStrategy::Gpu => {
                let device = self
                    .device
                    .as_ref()
                    .ok_or_else(|| ReframeError::gpu("no compute device available"))?;
                GpuExecutor::new(device, &self.config.gpu).render(
                    frames,
                    output_dir,
                    workers,
                    &self.cancel,
                )?
            }
        };

        tracing::info!(
            "{} run finished: {} processed, {} failed, {} cancelled in {:.1}ms",
            strategy,
            summary.processed,
            summary.failed,
            summary.cancelled,
            summary.elapsed_ms
        );

        if self.config.render.verify {
            verify_outputs(frames, output_dir)?;
        }
        Ok(summary)
    }

    /// Discover the frames in `input_dir` and render them.
    pub fn render_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        strategy: RenderStrategy,
    ) -> ReframeResult<RenderSummary> {
        let frames = self.config.frames.discover(input_dir)?;
        self.render(&frames, output_dir, strategy)
    }
}
