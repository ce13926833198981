//! Seeded synthetic sandbox.
//!
//! A flat bed at a fixed distance from the sensor with a handful of conical
//! hills. The terrain is generated once from the seed; each capture adds a
//! couple of millimetres of sensor noise on top.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{CaptureError, DepthImage, FrameSource, RawCapture};

/// Distance from the sensor to the empty sand bed.
pub const BED_DEPTH_MM: u16 = 1200;
const HILL_COUNT: usize = 5;
const MIN_HILL_HEIGHT_MM: f64 = 30.0;
const MAX_HILL_HEIGHT_MM: f64 = 120.0;
const NOISE_MM: i32 = 2;

pub struct SimulatedSource {
    terrain: DepthImage,
    rng: Mutex<StdRng>,
}

struct Hill {
    cx: f64,
    cy: f64,
    radius: f64,
    height: f64,
}

impl SimulatedSource {
    #[must_use]
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let hills = random_hills(&mut rng, width, height);
        let terrain = render_terrain(width, height, &hills);
        Self { terrain, rng: Mutex::new(rng) }
    }

    /// The noise-free terrain.
    #[must_use]
    pub fn terrain(&self) -> &DepthImage {
        &self.terrain
    }

    fn noisy_copy(&self) -> Result<DepthImage, CaptureError> {
        let terrain = self.terrain();
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let pixels = terrain
            .pixels()
            .iter()
            .map(|&d| {
                let noisy = i32::from(d) + rng.random_range(-NOISE_MM..=NOISE_MM);
                u16::try_from(noisy.max(1)).unwrap_or(u16::MAX)
            })
            .collect();
        DepthImage::new(terrain.width(), terrain.height(), pixels)
    }
}

#[async_trait]
impl FrameSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn capture(&self) -> Result<RawCapture, CaptureError> {
        let depth = self.noisy_copy()?;
        let rgb = Some((
            u32::try_from(depth.width()).unwrap_or(u32::MAX),
            u32::try_from(depth.height()).unwrap_or(u32::MAX),
        ));
        Ok(RawCapture { depth, rgb })
    }
}

#[allow(clippy::cast_precision_loss)]
fn random_hills(rng: &mut StdRng, width: usize, height: usize) -> Vec<Hill> {
    let (w, h) = (width as f64, height as f64);
    let short_side = w.min(h);
    (0..HILL_COUNT)
        .map(|_| Hill {
            cx: rng.random_range(w * 0.125..=w * 0.875),
            cy: rng.random_range(h * 0.125..=h * 0.875),
            radius: rng.random_range(short_side * 0.1..=short_side * 0.3).max(1.0),
            height: rng.random_range(MIN_HILL_HEIGHT_MM..=MAX_HILL_HEIGHT_MM),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn render_terrain(width: usize, height: usize, hills: &[Hill]) -> DepthImage {
    let mut image = DepthImage::filled(width, height, BED_DEPTH_MM);
    for y in 0..height {
        for x in 0..width {
            let elevation = hills
                .iter()
                .map(|hill| {
                    let d = ((x as f64 - hill.cx).powi(2) + (y as f64 - hill.cy).powi(2)).sqrt();
                    (hill.height * (1.0 - d / hill.radius)).max(0.0)
                })
                .fold(0.0_f64, f64::max);
            image.set(x, y, BED_DEPTH_MM - elevation.round() as u16);
        }
    }
    image
}

#[cfg(test)]
#[path = "simulated_test.rs"]
mod tests;
