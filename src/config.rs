//! Server configuration parsed from environment variables.
//!
//! Built once in `main` and shared read-only through `AppState`. Numeric
//! values that fail to parse fall back to their defaults; structurally
//! invalid settings are rejected so the server never starts half-configured.

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
pub const DEFAULT_MESH_WIDTH: u32 = 100;
pub const DEFAULT_MESH_HEIGHT: u32 = 75;
pub const DEFAULT_STREAM_FPS: u32 = 30;
pub const DEFAULT_MAX_STREAM_FPS: u32 = 60;
pub const DEFAULT_SIM_SEED: u64 = 42;
/// Largest accepted frame or mesh side, in pixels.
pub const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown depth source `{0}` (expected `simulated` or `none`)")]
    UnknownSource(String),
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
    #[error("{name} is {value}, above the {max} limit")]
    TooLarge { name: &'static str, value: u32, max: u32 },
    #[error("stream rate {fps} fps exceeds the {max} fps cap")]
    RateAboveCap { fps: u32, max: u32 },
}

/// Which frame source backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Seeded synthetic sandbox terrain.
    Simulated,
    /// No camera attached; every capture fails.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub source: SourceKind,
    pub frame_width: u32,
    pub frame_height: u32,
    pub mesh_width: u32,
    pub mesh_height: u32,
    pub stream_fps: u32,
    pub max_stream_fps: u32,
    pub sim_seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: frames::DEFAULT_PORT,
            source: SourceKind::Simulated,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            mesh_width: DEFAULT_MESH_WIDTH,
            mesh_height: DEFAULT_MESH_HEIGHT,
            stream_fps: DEFAULT_STREAM_FPS,
            max_stream_fps: DEFAULT_MAX_STREAM_FPS,
            sim_seed: DEFAULT_SIM_SEED,
        }
    }
}

impl ServerConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `DEPTH_HOST`: bind address, default `127.0.0.1`
    /// - `DEPTH_PORT`: default 8765
    /// - `DEPTH_SOURCE`: `simulated` (default) or `none`
    /// - `DEPTH_FRAME_WIDTH` / `DEPTH_FRAME_HEIGHT`: default 640x480
    /// - `DEPTH_MESH_WIDTH` / `DEPTH_MESH_HEIGHT`: default 100x75
    /// - `DEPTH_STREAM_FPS`: default 30
    /// - `DEPTH_MAX_STREAM_FPS`: default 60
    /// - `DEPTH_SIM_SEED`: default 42
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse_or = |key: &str, default: u32| -> u32 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let config = Self {
            host: lookup("DEPTH_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: lookup("DEPTH_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(frames::DEFAULT_PORT),
            source: parse_source(lookup("DEPTH_SOURCE").as_deref())?,
            frame_width: parse_or("DEPTH_FRAME_WIDTH", DEFAULT_FRAME_WIDTH),
            frame_height: parse_or("DEPTH_FRAME_HEIGHT", DEFAULT_FRAME_HEIGHT),
            mesh_width: parse_or("DEPTH_MESH_WIDTH", DEFAULT_MESH_WIDTH),
            mesh_height: parse_or("DEPTH_MESH_HEIGHT", DEFAULT_MESH_HEIGHT),
            stream_fps: parse_or("DEPTH_STREAM_FPS", DEFAULT_STREAM_FPS),
            max_stream_fps: parse_or("DEPTH_MAX_STREAM_FPS", DEFAULT_MAX_STREAM_FPS),
            sim_seed: lookup("DEPTH_SIM_SEED")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_SIM_SEED),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let dims = [
            ("DEPTH_FRAME_WIDTH", self.frame_width),
            ("DEPTH_FRAME_HEIGHT", self.frame_height),
            ("DEPTH_MESH_WIDTH", self.mesh_width),
            ("DEPTH_MESH_HEIGHT", self.mesh_height),
            ("DEPTH_STREAM_FPS", self.stream_fps),
            ("DEPTH_MAX_STREAM_FPS", self.max_stream_fps),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { name });
        }
        // The first four entries are frame and mesh sides.
        if let Some(&(name, value)) = dims[..4].iter().find(|(_, v)| *v > MAX_DIMENSION) {
            return Err(ConfigError::TooLarge { name, value, max: MAX_DIMENSION });
        }
        if self.stream_fps > self.max_stream_fps {
            return Err(ConfigError::RateAboveCap { fps: self.stream_fps, max: self.max_stream_fps });
        }
        Ok(())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Clamp a client-requested stream rate into `1..=max_stream_fps`.
    /// `None` selects the configured default.
    #[must_use]
    pub fn stream_rate(&self, requested: Option<u32>) -> u32 {
        requested.map_or(self.stream_fps, |fps| fps.clamp(1, self.max_stream_fps))
    }
}

fn parse_source(raw: Option<&str>) -> Result<SourceKind, ConfigError> {
    match raw.map(str::trim).unwrap_or("simulated") {
        "" | "simulated" | "sim" => Ok(SourceKind::Simulated),
        "none" | "unavailable" => Ok(SourceKind::Unavailable),
        other => Err(ConfigError::UnknownSource(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
