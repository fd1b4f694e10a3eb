use std::path::Path;
use std::process::{Command, Stdio};

use reframe_core::{FrameNaming, ReframeError, ReframeResult, VideoInfo};

/// Splits videos into numbered frame images and joins them back, by shelling
/// out to FFmpeg.
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    /// Check if FFmpeg is available on the system.
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Decode every frame of `video` into `output_dir` as `frame_0`, `frame_1`, ...
    ///
    /// Returns the number of frame files written.
    pub fn extract_frames(
        video: &Path,
        output_dir: &Path,
        naming: &FrameNaming,
    ) -> ReframeResult<usize> {
        if !video.exists() {
            return Err(ReframeError::asset(
                format!("video file not found: {}", video.display()),
                video,
            ));
        }
        Self::require_ffmpeg()?;
        std::fs::create_dir_all(output_dir)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y").arg("-i").arg(video);
        cmd.args(["-start_number", "0"]);
        cmd.arg(output_dir.join(naming.ffmpeg_pattern()));
        run(cmd, "frame extraction")?;

        let count = naming.discover(output_dir)?.len();
        tracing::info!(
            "Extracted {} frames from {} into {}",
            count,
            video.display(),
            output_dir.display()
        );
        Ok(count)
    }

    /// Encode the numbered frames in `frames_dir` into an H.264 MP4 at the
    /// frame rate (and, when known, the bitrate) of the probed source.
    pub fn encode_sequence(
        frames_dir: &Path,
        naming: &FrameNaming,
        info: &VideoInfo,
        output_path: &Path,
    ) -> ReframeResult<()> {
        let frames = naming.discover(frames_dir)?;
        if frames.is_empty() {
            return Err(ReframeError::Encode("no frames to encode".into()));
        }
        Self::require_ffmpeg()?;

        // Ensure output directory exists
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y"); // Overwrite output
        cmd.args(["-framerate", &format_frame_rate(info.fps)]);
        cmd.args(["-start_number", &frames[0].index().to_string()]);
        cmd.arg("-i").arg(frames_dir.join(naming.ffmpeg_pattern()));
        cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
        if info.bitrate > 0 {
            cmd.args(["-b:v", &info.bitrate.to_string()]);
        }
        cmd.arg(output_path);
        run(cmd, "encoding")?;

        tracing::info!(
            "Encoded {} frames to {} ({} @ {}fps)",
            frames.len(),
            output_path.display(),
            info.resolution(),
            info.fps
        );
        Ok(())
    }

    fn require_ffmpeg() -> ReframeResult<()> {
        if Self::is_available() {
            Ok(())
        } else {
            Err(ReframeError::Encode(
                "ffmpeg not found in PATH. Install FFmpeg: https://ffmpeg.org/download.html".into(),
            ))
        }
    }
}

/// Run an ffmpeg command to completion, surfacing stderr on failure.
fn run(mut cmd: Command, stage: &str) -> ReframeResult<()> {
    tracing::debug!("Running {:?}", cmd);
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ReframeError::Encode(format!("failed to start ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReframeError::Encode(format!(
            "ffmpeg {} failed with status {}: {}",
            stage, output.status, stderr
        )));
    }
    Ok(())
}

/// Frame rate as ffmpeg expects it: integral rates as `N/1`, NTSC-style
/// rates as their exact fraction.
fn format_frame_rate(fps: f64) -> String {
    if fps <= 0.0 || !fps.is_finite() {
        return "30/1".to_string();
    }
    if (fps - fps.round()).abs() < 1e-6 {
        return format!("{}/1", fps.round() as u64);
    }
    let ntsc = (fps * 1.001).round();
    if (ntsc * 1000.0 / 1001.0 - fps).abs() < 1e-3 {
        return format!("{}/1001", ntsc as u64 * 1000);
    }
    format!("{}", fps)
}
