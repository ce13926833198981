use super::*;
use crate::services;
use crate::state::test_helpers;

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

#[tokio::test]
async fn status_reports_source_and_calibration() {
    let state = test_helpers::test_app_state();
    let Json(before) = status(State(state.clone())).await;
    assert_eq!(before.source, "simulated");
    assert!(!before.calibrated);
    assert_eq!(before.stats.frames_processed, 0);

    services::capture::capture_frame(&state, false).await.unwrap();

    let Json(after) = status(State(state)).await;
    assert!(after.calibrated);
    assert_eq!(after.stats.frames_processed, 1);
}

#[tokio::test]
async fn status_serializes_nested_stats() {
    let state = test_helpers::unavailable_app_state();
    let Json(body) = status(State(state)).await;
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["source"], "unavailable");
    assert_eq!(json["stats"]["capture_errors"], 0);
}

#[tokio::test]
async fn version_returns_build_info() {
    let state = test_helpers::test_app_state();
    let Json(info) = version(State(state)).await;
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.features.streaming);
}

#[tokio::test]
async fn calibrate_clears_baseline() {
    let state = test_helpers::test_app_state();
    services::capture::capture_frame(&state, false).await.unwrap();
    assert!(state.calibrated());

    assert_eq!(calibrate(State(state.clone())).await, StatusCode::NO_CONTENT);
    assert!(!state.calibrated());
}
