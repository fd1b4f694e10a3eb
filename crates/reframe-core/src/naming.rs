//! Frame file naming convention shared by the extract, render and encode stages.
//!
//! Frames live on disk as `<prefix><index>.<extension>` (by default
//! `frame_<index>.png`). Frame order is the numeric order of the embedded
//! index, never the lexical order of the file names: `frame_10.png` sorts
//! after `frame_9.png`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::frame::FrameRef;
use crate::{ReframeError, ReframeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: "frame_".to_string(),
            extension: "png".to_string(),
        }
    }
}

impl FrameNaming {
    /// File name of the frame with the given index.
    pub fn file_name(&self, index: u64) -> String {
        format!("{}{}.{}", self.prefix, index, self.extension)
    }

    /// printf-style pattern understood by ffmpeg's image2 muxer/demuxer.
    pub fn ffmpeg_pattern(&self) -> String {
        format!("{}%d.{}", self.prefix, self.extension)
    }

    /// Extract the frame index embedded in a file name, if it follows the convention.
    pub fn parse_index(&self, file_name: &str) -> Option<u64> {
        let rest = file_name.strip_prefix(&self.prefix)?;
        let (digits, ext) = rest.rsplit_once('.')?;
        if !ext.eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Enumerate the frames in `dir`, ordered by their embedded index.
    ///
    /// Entries that do not follow the naming convention are ignored. Gaps in
    /// the index sequence are tolerated but logged.
    pub fn discover(&self, dir: &Path) -> ReframeResult<Vec<FrameRef>> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ReframeError::asset(format!("failed to read frame directory: {}", e), dir)
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(|n| self.parse_index(n)) else {
                continue;
            };
            frames.push(FrameRef::new(index, entry.path()));
        }

        frames.sort_by_key(|f| f.index());

        for (position, frame) in frames.iter().enumerate() {
            if frame.index() != position as u64 {
                tracing::warn!(
                    "frame sequence in {} is not gap-free: expected index {}, found {}",
                    dir.display(),
                    position,
                    frame.index()
                );
                break;
            }
        }

        Ok(frames)
    }
}
