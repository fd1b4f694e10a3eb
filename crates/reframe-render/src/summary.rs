use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use reframe_core::{FrameRef, RenderStrategy, ReframeResult};

/// Outcome of one render run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub strategy: RenderStrategy,
    /// Frames handed to the run.
    pub frames: usize,
    /// Frames written to the output directory.
    pub processed: usize,
    /// Frames skipped because loading, transforming or writing failed.
    pub failed: usize,
    /// Frames never started because the run was cancelled.
    pub cancelled: usize,
    /// Worker count (1 for the sequential strategy).
    pub workers: usize,
    pub elapsed_ms: f64,
}

impl RenderSummary {
    pub fn is_complete(&self) -> bool {
        self.processed == self.frames
    }
}

/// Thread-safe per-frame outcome counters for one run.
#[derive(Debug, Default)]
pub(crate) struct FrameTally {
    processed: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl FrameTally {
    /// Count a finished frame; failures are logged and the run moves on.
    pub(crate) fn record(&self, frame: &FrameRef, outcome: ReframeResult<()>) {
        match outcome {
            Ok(()) => {
                tracing::debug!("Rendered frame {}", frame.index());
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping frame {} ({}): {}",
                    frame.index(),
                    frame.path.display(),
                    e
                );
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn into_summary(
        self,
        strategy: RenderStrategy,
        frames: usize,
        workers: usize,
        elapsed: Duration,
    ) -> RenderSummary {
        RenderSummary {
            strategy,
            frames,
            processed: self.processed.into_inner(),
            failed: self.failed.into_inner(),
            cancelled: self.cancelled.into_inner(),
            workers,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }
}
