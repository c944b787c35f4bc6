//! Protocol message types for daemon-to-peer communication.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webtime_core::Tick;

/// Clock update pushed to a websocket peer.
///
/// Only the formatted time crosses the wire; the tick sequence number
/// stays inside the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUpdate {
    /// Formatted wall-clock time
    pub time: String,
}

impl TimeUpdate {
    /// Creates an update carrying the given time string.
    pub fn new(time: impl Into<String>) -> Self {
        Self { time: time.into() }
    }

    /// Serializes the update to its JSON text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parses an update from a JSON text frame.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

impl From<&Tick> for TimeUpdate {
    fn from(tick: &Tick) -> Self {
        Self::new(tick.time.clone())
    }
}

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),
}
