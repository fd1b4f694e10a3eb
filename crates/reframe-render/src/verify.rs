//! Output verification: every written frame must hash to the host transform
//! of its input.

use std::path::Path;

use serde::Serialize;

use reframe_core::hash::hash_frame;
use reframe_core::{FrameRef, ReframeError, ReframeResult};

use crate::image_loader::load_image;
use crate::shader::apply_shader;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    /// Inputs with no output (failed or cancelled frames).
    pub missing: Vec<u64>,
    pub mismatched: Vec<u64>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Compare each output in `output_dir` against the host transform of its input.
///
/// Missing outputs are reported but are not an error; the render summary
/// already counts them. A mismatching output is.
pub fn verify_outputs(frames: &[FrameRef], output_dir: &Path) -> ReframeResult<VerifyReport> {
    let mut report = VerifyReport::default();

    for frame in frames {
        let output = frame.output_path(output_dir);
        if !output.exists() {
            report.missing.push(frame.index());
            continue;
        }
        let expected = hash_frame(&apply_shader(&load_image(&frame.path)?));
        let actual = hash_frame(&load_image(&output)?);
        report.checked += 1;
        if expected != actual {
            tracing::warn!(
                "Frame {} does not match the host transform: expected {}, found {}",
                frame.index(),
                expected,
                actual
            );
            report.mismatched.push(frame.index());
        }
    }

    if !report.is_clean() {
        return Err(ReframeError::Render(format!(
            "{} of {} outputs differ from the host transform (frames {:?})",
            report.mismatched.len(),
            report.checked,
            report.mismatched
        )));
    }
    tracing::info!(
        "Verified {} outputs ({} missing)",
        report.checked,
        report.missing.len()
    );
    Ok(report)
}
