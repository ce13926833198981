use super::*;
use crate::state::test_helpers;

#[tokio::test]
async fn capture_produces_frame_and_counts_it() {
    let state = test_helpers::test_app_state();
    let frame = capture_frame(&state, false).await.unwrap();

    assert!(frame.has_payload());
    assert!(frame.topography.is_none());
    let depth = frame.depth_data.unwrap();
    assert_eq!((depth.width, depth.height), (64, 48));
    let mesh = frame.mesh_data.unwrap();
    assert_eq!((mesh.width, mesh.height), (16, 12));

    assert!(state.calibrated());
    assert_eq!(state.stats.snapshot().frames_processed, 1);
}

#[tokio::test]
async fn capture_with_topography() {
    let state = test_helpers::test_app_state();
    let frame = capture_frame(&state, true).await.unwrap();
    assert!(frame.topography.is_some());
}

#[tokio::test]
async fn consecutive_captures_have_increasing_ids() {
    let state = test_helpers::test_app_state();
    let first = capture_frame(&state, false).await.unwrap();
    let second = capture_frame(&state, false).await.unwrap();
    assert_eq!(second.frame_id, first.frame_id + 1);
}

#[tokio::test]
async fn unavailable_source_fails_and_counts_error() {
    let state = test_helpers::unavailable_app_state();
    let err = capture_frame(&state, false).await.unwrap_err();

    assert!(matches!(err, CaptureError::Unavailable(_)));
    let snap = state.stats.snapshot();
    assert_eq!(snap.capture_errors, 1);
    assert_eq!(snap.frames_processed, 0);
    assert!(!state.calibrated());
}
