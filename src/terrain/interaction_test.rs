use super::*;

const BED: u16 = 1200;

/// Baseline bed plus a copy with a raised rectangle.
fn scene(width: usize, height: usize, rect: (usize, usize, usize, usize), lift: u16) -> (DepthImage, DepthImage) {
    let baseline = DepthImage::filled(width, height, BED);
    let mut depth = baseline.clone();
    let (x0, y0, w, h) = rect;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            depth.set(x, y, BED - lift);
        }
    }
    (baseline, depth)
}

#[test]
fn flat_scene_has_no_hands() {
    let baseline = DepthImage::filled(64, 48, BED);
    let interaction = detect_hands(&baseline, &baseline.clone());
    assert!(!interaction.hands_detected);
    assert!(interaction.interaction_points.is_empty());
    assert!(interaction.terrain_modifications.is_empty());
}

#[test]
fn large_region_in_band_is_a_hand() {
    // 30x30 = 900 px, 100 mm above the bed.
    let (baseline, depth) = scene(100, 80, (20, 10, 30, 30), 100);
    let interaction = detect_hands(&baseline, &depth);

    assert!(interaction.hands_detected);
    assert_eq!(interaction.interaction_points.len(), 1);
    let point = &interaction.interaction_points[0];
    assert_eq!((point.x, point.y), (35, 25));
    assert!((point.area - 900.0).abs() < f64::EPSILON);
    assert!((point.height_above_baseline - 100.0).abs() < f64::EPSILON);
    assert!((point.normalized_x - 0.35).abs() < 1e-9);

    let modification = &interaction.terrain_modifications[0];
    assert!((modification.height_change - 0.1).abs() < 1e-9);
    assert!((modification.radius - MODIFICATION_RADIUS).abs() < f64::EPSILON);
    assert_eq!(modification.kind, "elevation");
}

#[test]
fn small_region_is_ignored() {
    // 20x20 = 400 px, below the area threshold.
    let (baseline, depth) = scene(100, 80, (5, 5, 20, 20), 100);
    assert!(!detect_hands(&baseline, &depth).hands_detected);
}

#[test]
fn region_outside_height_band_is_ignored() {
    let (baseline, too_low) = scene(100, 80, (10, 10, 40, 40), 20);
    assert!(!detect_hands(&baseline, &too_low).hands_detected);

    let (baseline, too_high) = scene(100, 80, (10, 10, 40, 40), 400);
    assert!(!detect_hands(&baseline, &too_high).hands_detected);
}

#[test]
fn separate_regions_are_separate_hands() {
    let (baseline, mut depth) = scene(120, 60, (0, 0, 25, 25), 80);
    for y in 30..55 {
        for x in 90..115 {
            depth.set(x, y, BED - 150);
        }
    }
    let interaction = detect_hands(&baseline, &depth);
    assert_eq!(interaction.interaction_points.len(), 2);
    assert_eq!(interaction.terrain_modifications.len(), 2);
}

#[test]
fn mismatched_shapes_report_nothing() {
    let baseline = DepthImage::filled(10, 10, BED);
    let depth = DepthImage::filled(20, 10, BED - 100);
    assert!(!detect_hands(&baseline, &depth).hands_detected);
}
