//! Video metadata probing through `ffprobe`.

use std::path::Path;
use std::process::{Command, Stdio};

use reframe_core::{ReframeError, ReframeResult, VideoInfo};

/// Check if ffprobe is available on the system.
pub fn is_available() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe a video file once for the metadata every later stage needs.
pub fn probe(path: &Path) -> ReframeResult<VideoInfo> {
    if !path.exists() {
        return Err(ReframeError::asset(
            format!("video file not found: {}", path.display()),
            path,
        ));
    }

    if !is_available() {
        return Err(ReframeError::Encode(
            "ffprobe not found in PATH. Install FFmpeg: https://ffmpeg.org/download.html".into(),
        ));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ReframeError::Encode(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReframeError::Encode(format!("ffprobe failed: {}", stderr)));
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let info = parse_probe_output(&name, &String::from_utf8_lossy(&output.stdout))?;

    tracing::info!(
        "Probed {}: {} @ {:.3} fps, {} kbps, ~{} frames",
        path.display(),
        info.resolution(),
        info.fps,
        info.bitrate / 1000,
        info.frame_count
    );
    Ok(info)
}

/// Build a [`VideoInfo`] from ffprobe's JSON report.
pub fn parse_probe_output(name: &str, json: &str) -> ReframeResult<VideoInfo> {
    let json: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ReframeError::Encode(format!("failed to parse ffprobe output: {}", e)))?;

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| ReframeError::Encode("no streams found in video".into()))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| ReframeError::Encode("no video stream found".into()))?;

    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| ReframeError::Encode("missing width in video stream".into()))?
        as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| ReframeError::Encode("missing height in video stream".into()))?
        as u32;

    // Parse frame rate from r_frame_rate (e.g., "30/1")
    let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

    // ffprobe reports numbers inside strings
    let number = |v: &serde_json::Value| v.as_str().and_then(|s| s.parse::<f64>().ok());

    let bitrate = number(&video_stream["bit_rate"])
        .or_else(|| number(&json["format"]["bit_rate"]))
        .unwrap_or(0.0) as u64;

    let duration_secs = number(&json["format"]["duration"])
        .or_else(|| number(&video_stream["duration"]))
        .unwrap_or(0.0);

    let frame_count = match number(&video_stream["nb_frames"]) {
        Some(n) => n as u64,
        None if duration_secs > 0.0 => (duration_secs * fps).round() as u64,
        None => 0,
    };

    Ok(VideoInfo {
        name: name.to_string(),
        width,
        height,
        fps,
        bitrate,
        frame_count,
    })
}

/// Parse a frame rate string like "30/1" or "24000/1001" into a float.
pub fn parse_frame_rate(rate_str: &str) -> f64 {
    if let Some((num_str, den_str)) = rate_str.split_once('/') {
        let num: f64 = num_str.parse().unwrap_or(30.0);
        let den: f64 = den_str.parse().unwrap_or(1.0);
        if den > 0.0 {
            num / den
        } else {
            30.0
        }
    } else {
        rate_str.parse::<f64>().unwrap_or(30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "codec_type": "audio", "bit_rate": "128000" },
            {
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "r_frame_rate": "30000/1001",
                "bit_rate": "2500000",
                "nb_frames": "300"
            }
        ],
        "format": { "duration": "10.010000", "bit_rate": "2700000" }
    }"#;

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("24000/1001") - 23.976).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!((parse_frame_rate("invalid") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("30/0") - 30.0).abs() < 0.001);
        assert!((parse_frame_rate("25") - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output("clip", SAMPLE).unwrap();
        assert_eq!(info.name, "clip");
        assert_eq!(info.resolution(), "1280 x 720");
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.bitrate, 2_500_000);
        assert_eq!(info.frame_count, 300);
    }

    #[test]
    fn test_frame_count_from_duration() {
        let json = r#"{
            "streams": [{ "codec_type": "video", "width": 4, "height": 2, "r_frame_rate": "25/1" }],
            "format": { "duration": "2.0", "bit_rate": "800" }
        }"#;
        let info = parse_probe_output("tiny", json).unwrap();
        assert_eq!(info.frame_count, 50);
        assert_eq!(info.bitrate, 800);
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{ "streams": [{ "codec_type": "audio" }], "format": {} }"#;
        assert!(matches!(
            parse_probe_output("song", json),
            Err(ReframeError::Encode(_))
        ));
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe(Path::new("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(ReframeError::Asset { .. })));
    }
}
