//! Depth statistics, elevation maps, and mesh downsampling.

use frames::{DepthData, ElevationStats, MeshData, Topography};

use crate::source::DepthImage;

/// Min / max / mean over valid (non-zero) pixels. `None` when every pixel is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn depth_stats(image: &DepthImage) -> Option<DepthData> {
    let mut min = u16::MAX;
    let mut max = 0_u16;
    let mut sum = 0_u64;
    let mut count = 0_u64;
    for &d in image.pixels().iter().filter(|&&d| d > 0) {
        min = min.min(d);
        max = max.max(d);
        sum += u64::from(d);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(DepthData {
        width: dim(image.width()),
        height: dim(image.height()),
        min_depth: f64::from(min),
        max_depth: f64::from(max),
        mean_depth: sum as f64 / count as f64,
    })
}

/// Per-pixel height above the baseline in millimetres. Pixels without a
/// reading in either image are treated as level with the baseline.
#[must_use]
pub fn elevation_map(baseline: &DepthImage, depth: &DepthImage) -> Vec<f64> {
    baseline
        .pixels()
        .iter()
        .zip(depth.pixels())
        .map(|(&b, &d)| {
            if b == 0 || d == 0 {
                0.0
            } else {
                f64::from(b) - f64::from(d)
            }
        })
        .collect()
}

/// Area-average `values` (row-major, `width` x `height`) down to `out_w` x `out_h`.
/// Upsampling repeats source pixels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn downsample(values: &[f64], width: usize, height: usize, out_w: usize, out_h: usize) -> Vec<f64> {
    let span = |i: usize, src: usize, out: usize| {
        let start = i * src / out;
        let end = ((i + 1) * src / out).max(start + 1).min(src);
        (start, end)
    };

    let mut out = Vec::with_capacity(out_w * out_h);
    for oy in 0..out_h {
        let (y0, y1) = span(oy, height, out_h);
        for ox in 0..out_w {
            let (x0, x1) = span(ox, width, out_w);
            let mut sum = 0.0;
            for y in y0..y1 {
                sum += values[y * width + x0..y * width + x1].iter().sum::<f64>();
            }
            out.push(sum / ((y1 - y0) * (x1 - x0)) as f64);
        }
    }
    out
}

/// Min–max scale into `0..=255`. A flat input maps to all zeros.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize(values: &[f64]) -> Vec<u8> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|v| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Terrain mesh from an elevation map. Heights are taken as magnitudes so
/// both dug-out and piled-up sand show relief.
#[must_use]
pub fn build_mesh(
    elevation: &[f64],
    width: usize,
    height: usize,
    mesh_width: usize,
    mesh_height: usize,
    frame_id: u64,
) -> MeshData {
    let magnitudes: Vec<f64> = elevation.iter().map(|e| e.abs()).collect();
    let cells = downsample(&magnitudes, width, height, mesh_width, mesh_height);
    MeshData { width: dim(mesh_width), height: dim(mesh_height), frame_id, data: normalize(&cells) }
}

/// Elevation statistics and roughness (standard deviation).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn topography(elevation: &[f64]) -> Topography {
    if elevation.is_empty() {
        return Topography {
            elevation_stats: ElevationStats { min: 0.0, max: 0.0, mean: 0.0 },
            roughness: 0.0,
        };
    }
    let n = elevation.len() as f64;
    let min = elevation.iter().copied().fold(f64::INFINITY, f64::min);
    let max = elevation.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = elevation.iter().sum::<f64>() / n;
    let variance = elevation.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    Topography { elevation_stats: ElevationStats { min, max, mean }, roughness: variance.sqrt() }
}

fn dim(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod tests;
