//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Config and build info are immutable after startup. The terrain pipeline
//! sits behind a mutex because calibration and frame numbering are shared by
//! every connection. Counters are lock-free atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::source::FrameSource;
use crate::terrain::FramePipeline;
use crate::version::BuildInfo;

// =============================================================================
// STATS
// =============================================================================

/// Server-wide counters, reported at `GET /status`.
pub struct ServerStats {
    started: Instant,
    frames_processed: AtomicU64,
    stream_frames: AtomicU64,
    capture_errors: AtomicU64,
    connected_clients: AtomicU64,
}

/// Point-in-time copy of `ServerStats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: f64,
    pub frames_processed: u64,
    pub stream_frames: u64,
    pub capture_errors: u64,
    pub connected_clients: u64,
    pub average_fps: f64,
}

impl ServerStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frames_processed: AtomicU64::new(0),
            stream_frames: AtomicU64::new(0),
            capture_errors: AtomicU64::new(0),
            connected_clients: AtomicU64::new(0),
        }
    }

    pub fn record_frame(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_frame(&self) {
        self.stream_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_connected(&self) {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        // Saturate at zero; never wraps.
        let _ = self
            .connected_clients
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> StatsSnapshot {
        let uptime_secs = self.started.elapsed().as_secs_f64();
        let frames_processed = self.frames_processed.load(Ordering::Relaxed);
        let average_fps = if uptime_secs > 0.0 { frames_processed as f64 / uptime_secs } else { 0.0 };
        StatsSnapshot {
            uptime_secs,
            frames_processed,
            stream_frames: self.stream_frames.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            connected_clients: self.connected_clients.load(Ordering::Relaxed),
            average_fps,
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; every field is
/// Arc-wrapped or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub build: Arc<BuildInfo>,
    pub source: Arc<dyn FrameSource>,
    pub pipeline: Arc<Mutex<FramePipeline>>,
    pub stats: Arc<ServerStats>,
    /// Cancelled once on shutdown; every connection watches it.
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, source: Arc<dyn FrameSource>) -> Self {
        let pipeline = FramePipeline::new(config.mesh_width as usize, config.mesh_height as usize);
        Self {
            config: Arc::new(config),
            build: Arc::new(BuildInfo::current()),
            source,
            pipeline: Arc::new(Mutex::new(pipeline)),
            stats: Arc::new(ServerStats::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Whether the terrain pipeline has a calibration baseline.
    #[must_use]
    pub fn calibrated(&self) -> bool {
        self.pipeline.lock().unwrap_or_else(std::sync::PoisonError::into_inner).has_baseline()
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::source::{SimulatedSource, UnavailableSource};

    /// Small simulated sandbox, fast enough for per-test captures.
    #[must_use]
    pub fn test_config() -> ServerConfig {
        ServerConfig {
            frame_width: 64,
            frame_height: 48,
            mesh_width: 16,
            mesh_height: 12,
            ..ServerConfig::default()
        }
    }

    #[must_use]
    pub fn test_app_state() -> AppState {
        let config = test_config();
        let source = Arc::new(SimulatedSource::new(
            config.frame_width as usize,
            config.frame_height as usize,
            config.sim_seed,
        ));
        AppState::new(config, source)
    }

    /// State whose source always fails like a missing camera.
    #[must_use]
    pub fn unavailable_app_state() -> AppState {
        AppState::new(test_config(), Arc::new(UnavailableSource))
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
