//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the depth websocket and a few small JSON
//! endpoints for health checks and tooling. The websocket is reachable at
//! both `/` and `/ws` so bare `ws://host:port` URLs work.

pub mod ws;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::{AppState, StatsSnapshot};
use crate::version::BuildInfo;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::handle_ws))
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/version", get(version))
        .route("/calibrate", post(calibrate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub source: &'static str,
    pub calibrated: bool,
    pub stats: StatsSnapshot,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        source: state.source.name(),
        calibrated: state.calibrated(),
        stats: state.stats.snapshot(),
    })
}

/// Drop the terrain baseline; the next captured frame recalibrates.
async fn calibrate(State(state): State<AppState>) -> StatusCode {
    state.pipeline.lock().unwrap_or_else(std::sync::PoisonError::into_inner).reset_baseline();
    tracing::info!("terrain baseline reset");
    StatusCode::NO_CONTENT
}

async fn version(State(state): State<AppState>) -> Json<BuildInfo> {
    Json((*state.build).clone())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
