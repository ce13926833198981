//! Hand detection against the calibration baseline.
//!
//! Anything hovering 50–300 mm above the sand is treated as a hand. Connected
//! regions of such pixels larger than `MIN_HAND_AREA` each produce one
//! interaction point at the region centroid plus a matching elevation edit.

use std::collections::VecDeque;

use frames::{Interaction, InteractionPoint, TerrainModification};

use crate::source::DepthImage;

pub const HAND_MIN_MM: f64 = 50.0;
pub const HAND_MAX_MM: f64 = 300.0;
pub const MIN_HAND_AREA: usize = 500;
pub const MODIFICATION_RADIUS: f64 = 0.05;

/// Find hands in `depth` relative to `baseline`. Images must share a shape;
/// mismatched images report no interaction.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn detect_hands(baseline: &DepthImage, depth: &DepthImage) -> Interaction {
    let mut interaction = Interaction::default();
    if !baseline.same_shape(depth) {
        return interaction;
    }

    let (width, height) = (depth.width(), depth.height());
    let mask: Vec<bool> = baseline
        .pixels()
        .iter()
        .zip(depth.pixels())
        .map(|(&b, &d)| {
            let lift = f64::from(b) - f64::from(d);
            b > 0 && d > 0 && lift > HAND_MIN_MM && lift < HAND_MAX_MM
        })
        .collect();

    let mut visited = vec![false; mask.len()];
    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let region = flood_region(&mask, &mut visited, width, height, start);
        if region.area <= MIN_HAND_AREA {
            continue;
        }

        let area = region.area as f64;
        let cx = (region.sum_x as f64 / area).round() as usize;
        let cy = (region.sum_y as f64 / area).round() as usize;
        let depth_mm = f64::from(depth.at(cx, cy));
        let height_above_baseline = f64::from(baseline.at(cx, cy)) - depth_mm;
        let normalized_x = cx as f64 / width as f64;
        let normalized_y = cy as f64 / height as f64;

        interaction.interaction_points.push(InteractionPoint {
            x: u32::try_from(cx).unwrap_or(u32::MAX),
            y: u32::try_from(cy).unwrap_or(u32::MAX),
            depth: depth_mm,
            height_above_baseline,
            area,
            normalized_x,
            normalized_y,
        });
        interaction.terrain_modifications.push(TerrainModification {
            x: normalized_x,
            y: normalized_y,
            height_change: height_above_baseline / 1000.0,
            radius: MODIFICATION_RADIUS,
            kind: "elevation".to_owned(),
        });
    }

    interaction.hands_detected = !interaction.interaction_points.is_empty();
    interaction
}

struct Region {
    area: usize,
    sum_x: usize,
    sum_y: usize,
}

/// 4-connected flood fill from `start`, marking pixels visited.
fn flood_region(mask: &[bool], visited: &mut [bool], width: usize, height: usize, start: usize) -> Region {
    let mut region = Region { area: 0, sum_x: 0, sum_y: 0 };
    let mut queue = VecDeque::from([start]);
    visited[start] = true;

    while let Some(idx) = queue.pop_front() {
        let (x, y) = (idx % width, idx / width);
        region.area += 1;
        region.sum_x += x;
        region.sum_y += y;

        let neighbours = [
            (x > 0).then(|| idx - 1),
            (x + 1 < width).then(|| idx + 1),
            (y > 0).then(|| idx - width),
            (y + 1 < height).then(|| idx + width),
        ];
        for next in neighbours.into_iter().flatten() {
            if mask[next] && !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    region
}

#[cfg(test)]
#[path = "interaction_test.rs"]
mod tests;
