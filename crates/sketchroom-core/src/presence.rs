//! Presence tracking for remote participants' cursors.
//!
//! Entries are refreshed by incoming position updates and evicted by a
//! periodic sweep once they go stale. The table approximates "who is active
//! right now"; it is not a roster.

use kurbo::Point;
use std::collections::HashMap;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default age after which a cursor is considered gone.
pub const DEFAULT_LIVENESS_WINDOW_MS: u64 = 3000;

/// Last known state of one remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub participant_id: String,
    /// Screen-space position reported by the participant.
    pub position: Point,
    /// Display color, if the participant sent one.
    pub color: Option<String>,
    pub last_seen: Instant,
}

impl PresenceEntry {
    /// Short label shown next to the cursor.
    pub fn label(&self) -> String {
        let short: String = self.participant_id.chars().take(4).collect();
        format!("User {short}")
    }
}

/// Participant id → presence entry.
#[derive(Debug, Clone, Default)]
pub struct PresenceTable {
    entries: HashMap<String, PresenceEntry>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `participant_id`.
    pub fn upsert(
        &mut self,
        participant_id: &str,
        position: Point,
        color: Option<String>,
        now: Instant,
    ) {
        let entry = PresenceEntry {
            participant_id: participant_id.to_string(),
            position,
            color,
            last_seen: now,
        };
        self.entries.insert(participant_id.to_string(), entry);
    }

    /// Remove every entry older than `liveness_window`.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep(&mut self, now: Instant, liveness_window: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= liveness_window);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("Presence sweep evicted {} stale cursor(s)", evicted);
        }
        evicted
    }

    /// All live entries, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &PresenceEntry> {
        self.entries.values()
    }

    pub fn get(&self, participant_id: &str) -> Option<&PresenceEntry> {
        self.entries.get(participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(DEFAULT_LIVENESS_WINDOW_MS);

    #[test]
    fn test_upsert_inserts_and_overwrites() {
        let mut table = PresenceTable::new();
        let start = Instant::now();

        table.upsert("alice", Point::new(1.0, 2.0), None, start);
        assert_eq!(table.len(), 1);

        let later = start + Duration::from_millis(50);
        table.upsert("alice", Point::new(5.0, 6.0), Some("#22c55e".into()), later);
        assert_eq!(table.len(), 1);

        let entry = table.get("alice").unwrap();
        assert_eq!(entry.position, Point::new(5.0, 6.0));
        assert_eq!(entry.color.as_deref(), Some("#22c55e"));
        assert_eq!(entry.last_seen, later);
    }

    #[test]
    fn test_ids_are_independent() {
        let mut table = PresenceTable::new();
        let start = Instant::now();
        table.upsert("a", Point::new(1.0, 1.0), None, start);
        table.upsert("b", Point::new(2.0, 2.0), None, start);
        table.upsert("a", Point::new(3.0, 3.0), None, start);

        assert_eq!(table.get("a").unwrap().position, Point::new(3.0, 3.0));
        assert_eq!(table.get("b").unwrap().position, Point::new(2.0, 2.0));
    }

    #[test]
    fn test_sweep_evicts_just_past_window() {
        let mut table = PresenceTable::new();
        let start = Instant::now();
        table.upsert("stale", Point::ZERO, None, start);

        let now = start + WINDOW + Duration::from_millis(1);
        assert_eq!(table.sweep(now, WINDOW), 1);
        assert!(table.all().next().is_none());
    }

    #[test]
    fn test_sweep_keeps_just_inside_window() {
        let mut table = PresenceTable::new();
        let start = Instant::now();
        table.upsert("fresh", Point::ZERO, None, start);

        let now = start + WINDOW - Duration::from_millis(1);
        assert_eq!(table.sweep(now, WINDOW), 0);
        assert_eq!(table.all().count(), 1);
    }

    #[test]
    fn test_refresh_extends_life() {
        let mut table = PresenceTable::new();
        let start = Instant::now();
        table.upsert("bob", Point::ZERO, None, start);
        table.upsert("bob", Point::ZERO, None, start + Duration::from_millis(2500));

        table.sweep(start + Duration::from_millis(4000), WINDOW);
        assert!(table.get("bob").is_some());
    }

    #[test]
    fn test_label_uses_id_prefix() {
        let mut table = PresenceTable::new();
        table.upsert("k3x9q2w7z", Point::ZERO, None, Instant::now());
        assert_eq!(table.get("k3x9q2w7z").unwrap().label(), "User k3x9");
    }
}
