//! Frame sources — where depth images come from.
//!
//! DESIGN
//! ======
//! The server only ever sees `Arc<dyn FrameSource>`. Hardware drivers are out
//! of tree; the built-in sources are a seeded simulation of a sandbox bed and
//! an "unavailable" source that behaves like a missing camera.

mod simulated;

use async_trait::async_trait;

pub use simulated::SimulatedSource;

use crate::config::{ServerConfig, SourceKind};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("depth camera unavailable: {0}")]
    Unavailable(String),
    #[error("depth image is {actual} pixels, expected {expected}")]
    Dimensions { expected: usize, actual: usize },
    #[error("depth image has no valid readings")]
    NoDepthReadings,
}

// =============================================================================
// IMAGES
// =============================================================================

/// Row-major depth image in millimetres. `0` means no reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthImage {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl DepthImage {
    /// Wrap a pixel buffer, checking it matches the dimensions.
    pub fn new(width: usize, height: usize, pixels: Vec<u16>) -> Result<Self, CaptureError> {
        let expected = width * height;
        if pixels.len() != expected || expected == 0 {
            return Err(CaptureError::Dimensions { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// Image filled with one depth value.
    #[must_use]
    pub fn filled(width: usize, height: usize, depth_mm: u16) -> Self {
        Self { width, height, pixels: vec![depth_mm; width * height] }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Depth at `(x, y)`. Panics on out-of-range coordinates like slice indexing.
    #[must_use]
    pub fn at(&self, x: usize, y: usize) -> u16 {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, depth_mm: u16) {
        self.pixels[y * self.width + x] = depth_mm;
    }

    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// One raw capture from a source.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub depth: DepthImage,
    /// Colour stream resolution, when the source has one.
    pub rgb: Option<(u32, u32)>,
}

// =============================================================================
// SOURCES
// =============================================================================

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Short label reported at `GET /status`.
    fn name(&self) -> &'static str;

    async fn capture(&self) -> Result<RawCapture, CaptureError>;
}

/// Stand-in for a sandbox with no camera attached.
pub struct UnavailableSource;

#[async_trait]
impl FrameSource for UnavailableSource {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn capture(&self) -> Result<RawCapture, CaptureError> {
        Err(CaptureError::Unavailable("no depth camera detected".into()))
    }
}

/// Build the source selected by config.
#[must_use]
pub fn build_source(config: &ServerConfig) -> std::sync::Arc<dyn FrameSource> {
    match config.source {
        SourceKind::Simulated => std::sync::Arc::new(SimulatedSource::new(
            config.frame_width as usize,
            config.frame_height as usize,
            config.sim_seed,
        )),
        SourceKind::Unavailable => std::sync::Arc::new(UnavailableSource),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
