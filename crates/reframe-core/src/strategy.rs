use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ReframeError;

/// The execution backend used to apply the pixel transform to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStrategy {
    /// One frame at a time on the calling thread.
    Sequential,
    /// Round-robin chunks processed on a CPU worker pool.
    ParallelCpu,
    /// Round-robin chunks whose pixels are transformed by a compute kernel.
    Gpu,
}

impl RenderStrategy {
    pub const ALL: [RenderStrategy; 3] = [
        RenderStrategy::Sequential,
        RenderStrategy::ParallelCpu,
        RenderStrategy::Gpu,
    ];

    /// Canonical name, as accepted by `from_str` and printed in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStrategy::Sequential => "sequential",
            RenderStrategy::ParallelCpu => "parallel",
            RenderStrategy::Gpu => "gpu",
        }
    }
}

impl std::fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderStrategy {
    type Err = ReframeError;

    /// Accepts the canonical names and the labels of the legacy upload form.
    /// Anything else is an error rather than a silent no-op.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "normal" | "normal rendering" => Ok(RenderStrategy::Sequential),
            "parallel" | "parallel-cpu" | "parallell rendering" | "parallel rendering" => {
                Ok(RenderStrategy::ParallelCpu)
            }
            "gpu" | "gpu-rendering" | "gpu rendering" => Ok(RenderStrategy::Gpu),
            other => Err(ReframeError::InvalidArgument(format!(
                "unknown render strategy '{}' (expected sequential, parallel or gpu)",
                other
            ))),
        }
    }
}
