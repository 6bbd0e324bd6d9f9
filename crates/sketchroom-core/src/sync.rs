//! Sync protocol handler.
//!
//! Bridges local mutations and the room channel: outbound mutations are
//! wrapped in [`Message`] envelopes and queued as JSON text, inbound frames are
//! decoded and applied to the [`DrawingLog`] and [`PresenceTable`].

use kurbo::Point;

use crate::config::random_base36;
use crate::drawing::{DrawingLog, LineSegment};
use crate::presence::PresenceTable;
use crate::protocol::{CursorUpdate, Message};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Length of a generated participant id.
pub const PARTICIPANT_ID_LEN: usize = 9;

/// Generate a participant id: lowercase base-36, [`PARTICIPANT_ID_LEN`] chars.
pub fn generate_participant_id() -> String {
    random_base36(PARTICIPANT_ID_LEN)
}

/// What an inbound message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A remote segment was appended.
    SegmentAppended,
    /// A remote cursor was inserted or refreshed.
    PresenceUpdated { participant_id: String },
    /// The log was wiped.
    BoardCleared,
    /// The room history was placed ahead of the local log.
    HistoryLoaded { segments: usize },
}

/// Outbound queue plus inbound dispatch for one participant.
#[derive(Debug)]
pub struct SyncHandler {
    participant_id: String,
    /// Color attached to outgoing cursor updates.
    cursor_color: Option<String>,
    /// Whether the channel is open; sends are dropped otherwise.
    connected: bool,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl SyncHandler {
    /// Create a handler with a fresh participant id.
    pub fn new() -> Self {
        Self::with_participant_id(generate_participant_id())
    }

    pub fn with_participant_id(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            cursor_color: None,
            connected: false,
            outgoing: Vec::new(),
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn set_cursor_color(&mut self, color: Option<String>) {
        self.cursor_color = color;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Mark the channel open or closed. Closing drops anything still queued.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if !connected {
            self.outgoing.clear();
        }
    }

    // --- Outbound ---

    /// Queue a locally drawn segment.
    pub fn send_segment(&mut self, segment: &LineSegment) {
        self.queue(&Message::DrawLine(segment.clone()));
    }

    /// Queue a cursor update at a screen-space position.
    pub fn send_cursor(&mut self, position: Point) {
        let update = CursorUpdate {
            user_id: self.participant_id.clone(),
            x: position.x,
            y: position.y,
            color: self.cursor_color.clone(),
        };
        self.queue(&Message::CursorMove(update));
    }

    /// Queue a board clear.
    pub fn send_clear(&mut self) {
        self.queue(&Message::ClearBoard);
    }

    fn queue(&mut self, msg: &Message) {
        if !self.connected {
            log::debug!("Dropping outbound {}: channel not open", msg.kind());
            return;
        }
        match msg.encode() {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::warn!("Failed to encode {}: {}", msg.kind(), e),
        }
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    // --- Inbound ---

    /// Apply an inbound text frame.
    ///
    /// Malformed frames and our own cursor echoes are ignored and leave the
    /// state untouched.
    pub fn handle_message(
        &self,
        text: &str,
        now: Instant,
        log: &mut DrawingLog,
        presence: &mut PresenceTable,
    ) -> Option<SyncEvent> {
        let msg = match Message::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                log::debug!("Ignoring inbound frame: {}", e);
                return None;
            }
        };

        match msg {
            Message::DrawLine(segment) => {
                log.append(segment);
                Some(SyncEvent::SegmentAppended)
            }
            Message::CursorMove(update) => {
                if update.user_id == self.participant_id {
                    return None;
                }
                presence.upsert(
                    &update.user_id,
                    Point::new(update.x, update.y),
                    update.color,
                    now,
                );
                Some(SyncEvent::PresenceUpdated {
                    participant_id: update.user_id,
                })
            }
            Message::ClearBoard => {
                log.clear();
                Some(SyncEvent::BoardCleared)
            }
            Message::History(segments) => {
                let count = segments.len();
                log.adopt_history(segments);
                Some(SyncEvent::HistoryLoaded { segments: count })
            }
        }
    }
}

impl Default for SyncHandler {
    fn default() -> Self {
        Self::new()
    }
}
