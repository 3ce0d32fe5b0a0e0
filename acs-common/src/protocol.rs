//! WebSocket wire protocol
//!
//! Inbound text frames carry a [`ControlMessage`], outbound text frames carry a
//! [`ServerMessage`]. Audio bytes travel as raw binary frames and have no
//! representation here: one binary frame is exactly one chunk.

use serde::{Deserialize, Serialize};

/// Client control message
///
/// ```json
/// {"action":"start","filename":"sample.mp3"}
/// {"action":"stop"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Begin streaming `filename`, superseding any transfer in progress
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },

    /// Cancel the transfer in progress
    Stop,
}

impl ControlMessage {
    /// Decode one inbound text frame
    pub fn parse(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Server notification
///
/// Serialized as `{"type":"status","data":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Human-readable session event
    Status { data: String },
}

impl ServerMessage {
    pub fn status(data: impl Into<String>) -> Self {
        ServerMessage::Status { data: data.into() }
    }

    /// Text carried by the message
    pub fn data(&self) -> &str {
        match self {
            ServerMessage::Status { data } => data,
        }
    }

    /// Encode as one outbound text frame
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Status texts sent to clients
pub mod status {
    pub const NO_FILENAME: &str = "Error: No filename provided";
    pub const FINISHED: &str = "Streaming finished";
    pub const STOPPED: &str = "Streaming stopped";
    pub const READ_ERROR: &str = "Error reading audio file";
    pub const OPEN_ERROR: &str = "Error opening audio file";
    pub const WRITE_ERROR: &str = "Error writing audio data";

    /// Sent before the first chunk of a transfer
    pub fn streaming(name: &str) -> String {
        format!("Streaming {}", name)
    }

    pub fn not_found(name: &str) -> String {
        format!("Error: File {} not found", name)
    }
}
