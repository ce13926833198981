use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn empty_environment_yields_defaults() {
    let config = ServerConfig::from_lookup(lookup_from(&[])).expect("defaults are valid");
    assert_eq!(config, ServerConfig::default());
    assert_eq!(config.bind_addr(), "127.0.0.1:8765");
}

#[test]
fn overrides_are_applied() {
    let config = ServerConfig::from_lookup(lookup_from(&[
        ("DEPTH_HOST", "0.0.0.0"),
        ("DEPTH_PORT", "9000"),
        ("DEPTH_SOURCE", "none"),
        ("DEPTH_MESH_WIDTH", "50"),
        ("DEPTH_STREAM_FPS", "10"),
        ("DEPTH_SIM_SEED", "7"),
    ]))
    .expect("valid config");

    assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    assert_eq!(config.source, SourceKind::Unavailable);
    assert_eq!(config.mesh_width, 50);
    assert_eq!(config.stream_fps, 10);
    assert_eq!(config.sim_seed, 7);
}

#[test]
fn unparsable_numbers_fall_back_to_defaults() {
    let config = ServerConfig::from_lookup(lookup_from(&[
        ("DEPTH_PORT", "not-a-port"),
        ("DEPTH_FRAME_WIDTH", "-3"),
    ]))
    .expect("valid config");

    assert_eq!(config.port, frames::DEFAULT_PORT);
    assert_eq!(config.frame_width, DEFAULT_FRAME_WIDTH);
}

#[test]
fn unknown_source_is_rejected() {
    let err = ServerConfig::from_lookup(lookup_from(&[("DEPTH_SOURCE", "kinect2")]))
        .expect_err("unknown source");
    assert_eq!(err, ConfigError::UnknownSource("kinect2".into()));
}

#[test]
fn zero_dimension_is_rejected() {
    let err = ServerConfig::from_lookup(lookup_from(&[("DEPTH_MESH_HEIGHT", "0")]))
        .expect_err("zero mesh height");
    assert_eq!(err, ConfigError::Zero { name: "DEPTH_MESH_HEIGHT" });
}

#[test]
fn oversized_frame_is_rejected() {
    let err = ServerConfig::from_lookup(lookup_from(&[
        ("DEPTH_FRAME_WIDTH", "1000000"),
        ("DEPTH_FRAME_HEIGHT", "1000000"),
    ]))
    .expect_err("oversized frame");
    assert_eq!(err, ConfigError::TooLarge { name: "DEPTH_FRAME_WIDTH", value: 1_000_000, max: MAX_DIMENSION });
}

#[test]
fn largest_side_is_accepted() {
    let config = ServerConfig::from_lookup(lookup_from(&[("DEPTH_MESH_WIDTH", "4096")])).unwrap();
    assert_eq!(config.mesh_width, MAX_DIMENSION);
}

#[test]
fn default_rate_above_cap_is_rejected() {
    let err = ServerConfig::from_lookup(lookup_from(&[
        ("DEPTH_STREAM_FPS", "90"),
        ("DEPTH_MAX_STREAM_FPS", "60"),
    ]))
    .expect_err("rate above cap");
    assert_eq!(err, ConfigError::RateAboveCap { fps: 90, max: 60 });
}

#[test]
fn stream_rate_clamps_requests() {
    let config = ServerConfig::default();
    assert_eq!(config.stream_rate(None), DEFAULT_STREAM_FPS);
    assert_eq!(config.stream_rate(Some(0)), 1);
    assert_eq!(config.stream_rate(Some(15)), 15);
    assert_eq!(config.stream_rate(Some(500)), DEFAULT_MAX_STREAM_FPS);
}
