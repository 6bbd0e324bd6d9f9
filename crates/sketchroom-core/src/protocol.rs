//! Wire format shared by clients and the relay.
//!
//! Every message is a JSON object with a `type` tag and, for most kinds, a
//! `data` payload:
//!
//! ```json
//! { "type": "draw_line", "data": { "x0": 10, "y0": 10, "x1": 50, "y1": 10, "color": "#ef4444" } }
//! { "type": "cursor_move", "data": { "userId": "k3x9q2w7z", "x": 120, "y": 48 } }
//! { "type": "clear_board" }
//! { "type": "history", "data": [ { "x0": 0, "y0": 0, "x1": 1, "y1": 1, "color": "#fff" } ] }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drawing::LineSegment;

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A cursor position update, in the sender's screen space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorUpdate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Messages exchanged over the room channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Append one segment (world space).
    DrawLine(LineSegment),
    /// Update a participant's cursor (screen space).
    CursorMove(CursorUpdate),
    /// Wipe the shared log.
    ClearBoard,
    /// Full room history, sent by the relay to a joining client.
    History(Vec<LineSegment>),
}

impl Message {
    /// Parse a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// The `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::DrawLine(_) => "draw_line",
            Message::CursorMove(_) => "cursor_move",
            Message::ClearBoard => "clear_board",
            Message::History(_) => "history",
        }
    }
}
