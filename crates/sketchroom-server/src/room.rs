//! Room registry: membership, fan-out channels and drawing history.

use dashmap::DashMap;
use sketchroom_core::{LineSegment, Message, ProtocolError};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::debug;

/// Per-room fan-out buffer. Slow peers skip what they miss.
const CHANNEL_CAPACITY: usize = 1024;

/// A frame fanned out to a room: sender peer id and JSON text.
pub type Relayed = (String, String);

/// The text to forward to `peer_id`, or `None` for its own frames.
pub fn outbound_for(peer_id: &str, relayed: Relayed) -> Option<String> {
    let (from, text) = relayed;
    (from != peer_id).then_some(text)
}

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<Relayed>,
    /// Connected peer IDs
    peers: HashSet<String>,
    /// Every segment drawn since the last clear
    history: Vec<LineSegment>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            history: Vec::new(),
        }
    }
}

/// What a peer gets when it joins.
pub struct Joined {
    pub rx: broadcast::Receiver<Relayed>,
    /// `history` frame to send first, if the room has any.
    pub history: Option<String>,
    pub peer_count: usize,
}

/// Active rooms
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer to a room, creating the room on first join.
    pub fn join(&self, room_id: &str, peer_id: &str) -> Result<Joined, ProtocolError> {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        let history = if room.history.is_empty() {
            None
        } else {
            Some(Message::History(room.history.clone()).encode()?)
        };
        Ok(Joined {
            rx: room.tx.subscribe(),
            history,
            peer_count: room.peers.len(),
        })
    }

    /// Remove a peer; the room and its history go away with the last peer.
    pub fn leave(&self, room_id: &str, peer_id: &str) {
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.peers.remove(peer_id);
                room.peers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room_id, |_, room| room.peers.is_empty());
            debug!("Room {} closed", room_id);
        }
    }

    /// Record a peer's frame and fan it out to the room.
    ///
    /// Only well-formed `draw_line`, `cursor_move` and `clear_board` frames are
    /// relayed; a `history` frame from a peer is dropped.
    pub fn relay(&self, room_id: &str, peer_id: &str, text: &str) -> Result<(), ProtocolError> {
        let msg = Message::decode(text)?;
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return Ok(());
        };
        match &msg {
            Message::DrawLine(segment) => room.history.push(segment.clone()),
            Message::ClearBoard => room.history.clear(),
            Message::CursorMove(_) => {}
            Message::History(_) => {
                debug!("Dropping history frame from {}", peer_id);
                return Ok(());
            }
        }
        // No receivers is fine: the sender may be alone.
        let _ = room.tx.send((peer_id.to_string(), msg.encode()?));
        Ok(())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    pub fn history_len(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAW: &str = r##"{"type":"draw_line","data":{"x0":1,"y0":2,"x1":3,"y1":4,"color":"#ef4444"}}"##;

    #[test]
    fn test_first_join_has_no_history() {
        let rooms = RoomRegistry::new();
        let joined = rooms.join("ROOM01", "a").unwrap();
        assert!(joined.history.is_none());
        assert_eq!(joined.peer_count, 1);
        assert_eq!(rooms.room_count(), 1);
    }

    #[test]
    fn test_history_replayed_on_join() {
        let rooms = RoomRegistry::new();
        rooms.join("ROOM01", "a").unwrap();
        rooms.relay("ROOM01", "a", DRAW).unwrap();
        rooms.relay("ROOM01", "a", DRAW).unwrap();

        let joined = rooms.join("ROOM01", "b").unwrap();
        let history = Message::decode(&joined.history.unwrap()).unwrap();
        match history {
            Message::History(segments) => {
                assert_eq!(segments.len(), 2);
                assert_eq!(segments[0].color, "#ef4444");
            }
            other => panic!("Wrong message type: {:?}", other),
        }
        assert_eq!(joined.peer_count, 2);
    }

    #[test]
    fn test_clear_empties_history() {
        let rooms = RoomRegistry::new();
        rooms.join("ROOM01", "a").unwrap();
        rooms.relay("ROOM01", "a", DRAW).unwrap();
        rooms.relay("ROOM01", "a", r#"{"type":"clear_board"}"#).unwrap();

        assert_eq!(rooms.history_len("ROOM01"), 0);
        assert!(rooms.join("ROOM01", "b").unwrap().history.is_none());
    }

    #[test]
    fn test_relay_tags_sender() {
        let rooms = RoomRegistry::new();
        rooms.join("ROOM01", "a").unwrap();
        let mut rx = rooms.join("ROOM01", "b").unwrap().rx;

        rooms
            .relay("ROOM01", "a", r#"{"type":"cursor_move","data":{"userId":"a","x":1,"y":1}}"#)
            .unwrap();
        let (from, text) = rx.try_recv().unwrap();
        assert_eq!(from, "a");
        assert_eq!(Message::decode(&text).unwrap().kind(), "cursor_move");
        assert_eq!(rooms.history_len("ROOM01"), 0);
    }

    #[test]
    fn test_sender_does_not_get_its_own_frame() {
        let rooms = RoomRegistry::new();
        let mut rx_a = rooms.join("ROOM01", "a").unwrap().rx;
        let mut rx_b = rooms.join("ROOM01", "b").unwrap().rx;

        rooms.relay("ROOM01", "a", DRAW).unwrap();

        assert_eq!(outbound_for("a", rx_a.try_recv().unwrap()), None);
        let text = outbound_for("b", rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(Message::decode(&text).unwrap().kind(), "draw_line");
    }

    #[test]
    fn test_invalid_frames_not_relayed() {
        let rooms = RoomRegistry::new();
        let mut rx = rooms.join("ROOM01", "a").unwrap().rx;

        assert!(rooms.relay("ROOM01", "a", "not json").is_err());
        rooms
            .relay("ROOM01", "a", r#"{"type":"history","data":[]}"#)
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let rooms = RoomRegistry::new();
        rooms.join("ONE", "a").unwrap();
        let mut other = rooms.join("TWO", "b").unwrap().rx;

        rooms.relay("ONE", "a", DRAW).unwrap();
        assert!(other.try_recv().is_err());
        assert_eq!(rooms.history_len("TWO"), 0);
    }

    #[test]
    fn test_last_leave_drops_room() {
        let rooms = RoomRegistry::new();
        rooms.join("ROOM01", "a").unwrap();
        rooms.join("ROOM01", "b").unwrap();
        rooms.relay("ROOM01", "a", DRAW).unwrap();

        rooms.leave("ROOM01", "a");
        assert_eq!(rooms.peer_count("ROOM01"), 1);
        assert_eq!(rooms.history_len("ROOM01"), 1);

        rooms.leave("ROOM01", "b");
        assert_eq!(rooms.room_count(), 0);
        assert!(rooms.join("ROOM01", "c").unwrap().history.is_none());
    }
}
