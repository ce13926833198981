//! Shared message model and JSON codec for the depth link.
//!
//! This crate owns the wire representation used by both the depth server and
//! the test client. Every message is a JSON object carrying a `type` tag and
//! travels as one WebSocket text frame.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default depth server port.
pub const DEFAULT_PORT: u16 = 8765;

/// Default depth server endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:8765";

/// Wire names of every message type, in declaration order.
pub const MESSAGE_TYPES: [&str; 9] = [
    "ping",
    "pong",
    "get_frame",
    "frame_data",
    "start_stream",
    "stop_stream",
    "stream_started",
    "stream_stopped",
    "error",
];

/// Error returned by [`decode_message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not valid JSON.
    #[error("invalid JSON format: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The text is valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,
    /// The `type` tag is missing or names no known message.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// The `type` tag is known but the remaining fields do not fit it.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// True when the text could not be read as a JSON object at all.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::InvalidJson(_) | Self::NotAnObject)
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A single message on the depth link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Liveness probe sent by the client.
    Ping,
    /// Reply to [`Message::Ping`].
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    /// Request for exactly one frame.
    GetFrame {
        #[serde(default)]
        include_topography: bool,
    },
    /// One captured frame, either requested or pushed by a stream.
    FrameData(FrameData),
    /// Begin pushing frames on this connection.
    StartStream {
        #[serde(default)]
        include_topography: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fps: Option<u32>,
    },
    /// Stop pushing frames on this connection.
    StopStream,
    /// Acknowledges [`Message::StartStream`].
    StreamStarted { message: String },
    /// Acknowledges [`Message::StopStream`].
    StreamStopped { message: String },
    /// Failure report. `message` is never empty.
    Error { message: String },
}

impl Message {
    /// Wire name of this message's `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Pong { .. } => "pong",
            Self::GetFrame { .. } => "get_frame",
            Self::FrameData(_) => "frame_data",
            Self::StartStream { .. } => "start_stream",
            Self::StopStream => "stop_stream",
            Self::StreamStarted { .. } => "stream_started",
            Self::StreamStopped { .. } => "stream_stopped",
            Self::Error { .. } => "error",
        }
    }

    /// Pong stamped with the current time.
    #[must_use]
    pub fn pong() -> Self {
        Self::Pong { timestamp: Some(now_secs()) }
    }

    /// Error message. An empty message is replaced with a generic one.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unspecified error".to_owned();
        }
        Self::Error { message }
    }
}

// =============================================================================
// FRAME PAYLOAD
// =============================================================================

/// Payload of a `frame_data` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    /// Seconds since the Unix epoch when the frame was captured.
    pub timestamp: f64,
    /// Monotonic per-server frame counter.
    #[serde(default)]
    pub frame_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_data: Option<DepthData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_data: Option<RgbData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_data: Option<MeshData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topography: Option<Topography>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Interaction>,
}

impl FrameData {
    /// True when at least one of depth, RGB, or mesh data is present.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.depth_data.is_some() || self.rgb_data.is_some() || self.mesh_data.is_some()
    }
}

/// Depth image summary, in millimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthData {
    pub width: u32,
    pub height: u32,
    pub min_depth: f64,
    pub max_depth: f64,
    #[serde(default)]
    pub mean_depth: f64,
}

/// Colour image dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbData {
    pub width: u32,
    pub height: u32,
}

/// Downsampled terrain heights, row-major, normalised to `0..=255`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshData {
    pub width: u32,
    pub height: u32,
    pub frame_id: u64,
    pub data: Vec<u8>,
}

/// Elevation summary relative to the calibration baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topography {
    pub elevation_stats: ElevationStats,
    pub roughness: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Hands (or other objects) held above the sand surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub hands_detected: bool,
    pub interaction_points: Vec<InteractionPoint>,
    pub terrain_modifications: Vec<TerrainModification>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionPoint {
    pub x: u32,
    pub y: u32,
    pub depth: f64,
    pub height_above_baseline: f64,
    pub area: f64,
    pub normalized_x: f64,
    pub normalized_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainModification {
    pub x: f64,
    pub y: f64,
    /// Metres.
    pub height_change: f64,
    /// Fraction of the terrain extent.
    pub radius: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a message as JSON text.
#[must_use]
pub fn encode_message(message: &Message) -> String {
    // Every field is a plain number, string, bool, or sequence of those, so
    // serialization cannot fail.
    serde_json::to_string(message).unwrap_or_default()
}

/// Decode JSON text into a message.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] or [`CodecError::NotAnObject`] for text
/// that is not a JSON object, [`CodecError::UnknownType`] when the `type` tag
/// is missing or unrecognised, and [`CodecError::InvalidPayload`] when a known
/// message carries ill-typed fields.
pub fn decode_message(text: &str) -> Result<Message, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(CodecError::InvalidJson)?;
    let Some(object) = value.as_object() else {
        return Err(CodecError::NotAnObject);
    };

    let kind = object.get("type").and_then(Value::as_str).unwrap_or("unknown");
    if !MESSAGE_TYPES.contains(&kind) {
        return Err(CodecError::UnknownType(kind.to_owned()));
    }
    let kind = kind.to_owned();

    serde_json::from_value(value).map_err(|source| CodecError::InvalidPayload { kind, source })
}

/// Current time as seconds since the Unix epoch.
#[must_use]
pub fn now_secs() -> f64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0.0;
    };
    dur.as_secs_f64()
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
