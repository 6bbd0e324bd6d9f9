//! Session configuration: room, relay address and timing knobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
use web_time::Duration;

use crate::input::DEFAULT_DRAW_COLOR;
use crate::presence::DEFAULT_LIVENESS_WINDOW_MS;
use crate::throttle::DEFAULT_CURSOR_THROTTLE_MS;

/// Default relay endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";
/// Default interval between presence sweeps.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;
/// Default stroke width in pixels.
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;
/// Length of generated room ids.
pub const ROOM_ID_LEN: usize = 6;
/// Longest room id accepted from the outside.
const MAX_ROOM_ID_LEN: usize = 64;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid room id: {0:?}")]
    InvalidRoom(String),
    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),
}

/// Short identifier scoping a session to a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parse a room id taken from a URL or user input.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_ROOM_ID_LEN
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ConfigError::InvalidRoom(raw.to_string()))
        }
    }

    /// Generate a fresh room id: uppercase base-36, [`ROOM_ID_LEN`] chars.
    pub fn generate() -> Self {
        Self(random_base36(ROOM_ID_LEN).to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomId::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

/// Random lowercase base-36 token of `len` chars.
pub(crate) fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut value = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    out
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Settings for one drawing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Relay websocket endpoint, without the room parameter.
    pub server_url: String,
    /// Room to join; generated when absent.
    pub room: Option<RoomId>,
    /// Presence entries older than this are swept.
    pub liveness_window_ms: u64,
    /// How often the presence sweep runs.
    pub sweep_interval_ms: u64,
    /// Minimum spacing between outbound cursor updates.
    pub cursor_throttle_ms: u64,
    /// Stroke width used by the render pass.
    pub line_width: f64,
    /// Initial draw color.
    pub draw_color: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room: None,
            liveness_window_ms: DEFAULT_LIVENESS_WINDOW_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            cursor_throttle_ms: DEFAULT_CURSOR_THROTTLE_MS,
            line_width: DEFAULT_LINE_WIDTH,
            draw_color: DEFAULT_DRAW_COLOR.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relay endpoint.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the room.
    pub fn with_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    /// Set the presence liveness window.
    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window_ms = millis(window);
        self
    }

    /// Set how often the presence sweep runs.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = millis(interval);
        self
    }

    /// Set the cursor throttle interval.
    pub fn with_cursor_throttle(mut self, interval: Duration) -> Self {
        self.cursor_throttle_ms = millis(interval);
        self
    }

    /// Set the stroke width.
    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    /// Set the initial draw color.
    pub fn with_draw_color(mut self, color: impl Into<String>) -> Self {
        self.draw_color = color.into();
        self
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.liveness_window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn cursor_throttle(&self) -> Duration {
        Duration::from_millis(self.cursor_throttle_ms)
    }

    /// The configured room, generating and storing one if needed.
    pub fn ensure_room(&mut self) -> &RoomId {
        self.room.get_or_insert_with(RoomId::generate)
    }

    /// Websocket URL for `room`: the server URL with `?room=<id>`.
    pub fn websocket_url(&self, room: &RoomId) -> Result<String, ConfigError> {
        let mut url = url::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidServerUrl(e.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidServerUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        url.query_pairs_mut().clear().append_pair("room", room.as_str());
        Ok(url.into())
    }
}

/// Shareable link to `room` from a page URL.
pub fn invite_link(page_url: &str, room: &RoomId) -> Result<String, ConfigError> {
    let mut url =
        url::Url::parse(page_url).map_err(|e| ConfigError::InvalidServerUrl(e.to_string()))?;
    url.query_pairs_mut().clear().append_pair("room", room.as_str());
    Ok(url.into())
}

/// Room id from a page URL's `room` query parameter, if any.
pub fn room_from_url(page_url: &str) -> Option<RoomId> {
    let url = url::Url::parse(page_url).ok()?;
    let (_, value) = url.query_pairs().find(|(key, _)| key == "room")?;
    RoomId::parse(&value).ok()
}
