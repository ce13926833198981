//! Frame capture service.
//!
//! One call = one capture from the source plus one pass through the terrain
//! pipeline. The source is awaited before the pipeline lock is taken, so a
//! slow camera never blocks other connections from reading calibration state.

use frames::FrameData;
use tracing::warn;

use crate::source::{CaptureError, RawCapture};
use crate::state::AppState;

/// Capture and process one frame, updating server counters.
///
/// # Errors
///
/// Returns the source's `CaptureError`, or `NoDepthReadings` when the capture
/// has no usable pixels. Every failure is counted in `capture_errors`.
pub async fn capture_frame(state: &AppState, include_topography: bool) -> Result<FrameData, CaptureError> {
    let raw = state.source.capture().await;
    let result = raw.and_then(|raw| process(state, &raw, include_topography));

    match &result {
        Ok(_) => state.stats.record_frame(),
        Err(e) => {
            state.stats.record_capture_error();
            warn!(source = state.source.name(), error = %e, "capture: frame failed");
        }
    }
    result
}

fn process(state: &AppState, raw: &RawCapture, include_topography: bool) -> Result<FrameData, CaptureError> {
    let mut pipeline = state.pipeline.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    pipeline.process(raw, include_topography)
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
