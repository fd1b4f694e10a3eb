use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::FrameNaming;
use crate::{ReframeError, ReframeResult};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RenderConfig {
    /// Worker count for the chunked strategies. 0 = available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Re-hash every written output against the host transform.
    #[serde(default)]
    pub verify: bool,
}

impl RenderConfig {
    /// Resolve `workers`, falling back to the hardware parallelism of this machine.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GpuBackend {
    /// A real adapter through wgpu.
    #[default]
    Wgpu,
    /// The host-side kernel emulator.
    Emulated,
}

impl std::str::FromStr for GpuBackend {
    type Err = ReframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wgpu" | "gpu" => Ok(GpuBackend::Wgpu),
            "emulated" | "host" => Ok(GpuBackend::Emulated),
            other => Err(ReframeError::InvalidArgument(format!(
                "unknown gpu backend '{}' (expected wgpu or emulated)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GpuConfig {
    pub backend: GpuBackend,
    /// Number of kernel lanes. 0 = enough lanes to cover the frame in one step.
    pub lanes: u32,
    /// Upper bound on the wait for one kernel submission to complete.
    pub submit_timeout_ms: u64,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            backend: GpuBackend::Wgpu,
            lanes: 0,
            submit_timeout_ms: 30_000,
        }
    }
}

impl GpuConfig {
    pub fn submit_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.submit_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the per-run working directories (extracts, renders).
    pub work_dir: PathBuf,
    /// JSON-lines file that collects per-stage metrics.
    pub metrics_path: PathBuf,
    /// Keep the extracted and rendered frames after encoding.
    pub keep_temp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("reframe-work"),
            metrics_path: PathBuf::from("metrics.jsonl"),
            keep_temp: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReframeConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub gpu: GpuConfig,
    #[serde(default)]
    pub frames: FrameNaming,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ReframeConfig {
    pub fn load_from_file(path: &Path) -> ReframeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ReframeError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to_file(&self, path: &Path) -> ReframeResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ReframeError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Metadata probed once from the source video and handed to every stage
/// that needs it. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Source file name without extension.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate (fps).
    pub fps: f64,
    /// Video stream bitrate in bits per second, 0 when unknown.
    pub bitrate: u64,
    /// Estimated number of frames.
    pub frame_count: u64,
}

impl VideoInfo {
    /// Human-readable resolution, e.g. `1920 x 1080`.
    pub fn resolution(&self) -> String {
        format!("{} x {}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: ReframeConfig = toml::from_str("").unwrap();
        assert_eq!(config.render.workers, 0);
        assert_eq!(config.gpu.backend, GpuBackend::Wgpu);
        assert_eq!(config.frames, FrameNaming::default());
        assert!(!config.pipeline.keep_temp);
    }

    #[test]
    fn test_partial_toml() {
        let config: ReframeConfig = toml::from_str(
            r#"
            [render]
            workers = 3

            [gpu]
            backend = "emulated"
            lanes = 16
            submit_timeout_ms = 500

            [frames]
            extension = "bmp"
            "#,
        )
        .unwrap();
        assert_eq!(config.render.worker_count(), 3);
        assert_eq!(config.gpu.backend, GpuBackend::Emulated);
        assert_eq!(config.gpu.lanes, 16);
        assert_eq!(config.frames.prefix, "frame_");
        assert_eq!(config.frames.extension, "bmp");
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!("Emulated".parse::<GpuBackend>().unwrap(), GpuBackend::Emulated);
        assert_eq!("wgpu".parse::<GpuBackend>().unwrap(), GpuBackend::Wgpu);
        assert!("opencl".parse::<GpuBackend>().is_err());
    }

    #[test]
    fn test_worker_count_auto_is_positive() {
        assert!(RenderConfig::default().worker_count() >= 1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("reframe_config_{}.toml", std::process::id()));
        let mut config = ReframeConfig::default();
        config.render.workers = 5;
        config.save_to_file(&path).unwrap();
        let loaded = ReframeConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.render.workers, 5);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let path = std::env::temp_dir()
            .join(format!("reframe_bad_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[render]\nworkers = \"many\"\n").unwrap();
        let result = ReframeConfig::load_from_file(&path);
        assert!(matches!(result, Err(ReframeError::Config(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_video_info_resolution() {
        let info = VideoInfo {
            name: "clip".into(),
            width: 1280,
            height: 720,
            fps: 30.0,
            bitrate: 0,
            frame_count: 90,
        };
        assert_eq!(info.resolution(), "1280 x 720");
    }
}
