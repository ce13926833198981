//! Terrain pipeline — raw depth captures to wire frames.
//!
//! DESIGN
//! ======
//! The first frame processed becomes the calibration baseline; elevation is
//! measured against it from then on. A capture whose shape differs from the
//! baseline (source reconfigured) recalibrates instead of failing.
//!
//! Stages per frame:
//! 1. Depth statistics over valid pixels
//! 2. Elevation map against the baseline
//! 3. Downsampled, normalised mesh
//! 4. Hand detection
//! 5. Topography, only on request

pub mod interaction;
pub mod mesh;

use frames::{FrameData, RgbData};

use crate::source::{CaptureError, DepthImage, RawCapture};

pub struct FramePipeline {
    mesh_width: usize,
    mesh_height: usize,
    baseline: Option<DepthImage>,
    frames_processed: u64,
}

impl FramePipeline {
    #[must_use]
    pub fn new(mesh_width: usize, mesh_height: usize) -> Self {
        Self { mesh_width: mesh_width.max(1), mesh_height: mesh_height.max(1), baseline: None, frames_processed: 0 }
    }

    #[must_use]
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Forget the calibration; the next frame becomes the new baseline.
    pub fn reset_baseline(&mut self) {
        self.baseline = None;
    }

    /// Process one capture into a frame.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::NoDepthReadings` when no pixel has a reading.
    /// The baseline and frame counter are left untouched in that case.
    pub fn process(&mut self, raw: &RawCapture, include_topography: bool) -> Result<FrameData, CaptureError> {
        let depth = &raw.depth;
        let stats = mesh::depth_stats(depth).ok_or(CaptureError::NoDepthReadings)?;

        if self.baseline.as_ref().is_some_and(|b| !b.same_shape(depth)) {
            tracing::info!(width = depth.width(), height = depth.height(), "terrain: shape changed, recalibrating");
            self.baseline = None;
        }
        let baseline = self.baseline.get_or_insert_with(|| depth.clone());

        let frame_id = self.frames_processed;
        let elevation = mesh::elevation_map(baseline, depth);
        let mesh_data =
            mesh::build_mesh(&elevation, depth.width(), depth.height(), self.mesh_width, self.mesh_height, frame_id);
        let interaction = interaction::detect_hands(baseline, depth);
        let topography = include_topography.then(|| mesh::topography(&elevation));

        self.frames_processed += 1;

        Ok(FrameData {
            timestamp: frames::now_secs(),
            frame_id,
            depth_data: Some(stats),
            rgb_data: raw.rgb.map(|(width, height)| RgbData { width, height }),
            mesh_data: Some(mesh_data),
            topography,
            interaction: Some(interaction),
        })
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
