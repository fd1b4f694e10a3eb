//! # reframe-encode
//!
//! The video side of a render run: probes the source video, splits it into
//! numbered frame images and encodes a rendered frame sequence back into an
//! H.264 video. Shells out to FFmpeg.

pub mod ffmpeg;
pub mod probe;

pub use ffmpeg::FfmpegEncoder;
pub use probe::probe;
