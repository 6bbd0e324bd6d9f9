//! The shared whiteboard: owns the session state and routes the three event
//! sources (pointer input, transport, timers) into it.

use crate::camera::Camera;
use crate::config::{ConfigError, RoomId, SessionConfig};
use crate::drawing::DrawingLog;
use crate::input::{InputAction, InputPipeline, PointerEvent, ToolKind};
use crate::presence::PresenceTable;
use crate::sync::{SyncEvent, SyncHandler};
use crate::throttle::Throttle;
use crate::transport::{ConnectionState, Transport, TransportEvent};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// One participant's view of a shared room.
#[derive(Debug)]
pub struct Whiteboard {
    config: SessionConfig,
    room: RoomId,
    camera: Camera,
    log: DrawingLog,
    presence: PresenceTable,
    input: InputPipeline,
    sync: SyncHandler,
    connection: ConnectionState,
    last_sweep: Option<Instant>,
    torn_down: bool,
}

impl Whiteboard {
    /// Create a whiteboard with a fresh participant id.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_sync(config, SyncHandler::new())
    }

    /// Create a whiteboard with a fixed participant id.
    pub fn with_participant_id(config: SessionConfig, participant_id: impl Into<String>) -> Self {
        Self::with_sync(config, SyncHandler::with_participant_id(participant_id))
    }

    fn with_sync(mut config: SessionConfig, sync: SyncHandler) -> Self {
        let room = config.ensure_room().clone();
        let mut input = InputPipeline::new(Throttle::new(config.cursor_throttle()));
        input.set_color(config.draw_color.clone());
        log::info!(
            "Whiteboard ready: room {}, participant {}",
            room,
            sync.participant_id()
        );
        Self {
            config,
            room,
            camera: Camera::new(),
            log: DrawingLog::new(),
            presence: PresenceTable::new(),
            input,
            sync,
            connection: ConnectionState::Disconnected,
            last_sweep: None,
            torn_down: false,
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn participant_id(&self) -> &str {
        self.sync.participant_id()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn log(&self) -> &DrawingLog {
        &self.log
    }

    pub fn presence(&self) -> &PresenceTable {
        &self.presence
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// URL of the room channel.
    pub fn websocket_url(&self) -> Result<String, ConfigError> {
        self.config.websocket_url(&self.room)
    }

    pub fn tool(&self) -> ToolKind {
        self.input.tool()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.input.set_tool(tool);
    }

    pub fn color(&self) -> &str {
        self.input.color()
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.input.set_color(color);
    }

    /// Color attached to outgoing cursor updates.
    pub fn set_cursor_color(&mut self, color: Option<String>) {
        self.sync.set_cursor_color(color);
    }

    // --- Input ---

    /// Apply a pointer event: pan the camera, append and broadcast a segment,
    /// and broadcast the cursor, as the input pipeline decides.
    pub fn handle_pointer_event(&mut self, event: PointerEvent, now: Instant) {
        for action in self.input.handle_pointer_event(event, &self.camera, now) {
            match action {
                InputAction::Pan(delta) => self.camera.pan(delta),
                InputAction::Draw(segment) => {
                    self.sync.send_segment(&segment);
                    self.log.append(segment);
                }
                InputAction::Cursor(position) => self.sync.send_cursor(position),
            }
        }
    }

    /// Wipe the board locally and tell the room.
    pub fn clear_board(&mut self) {
        self.log.clear();
        self.sync.send_clear();
    }

    // --- Transport ---

    /// Apply one transport event.
    pub fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        now: Instant,
    ) -> Option<SyncEvent> {
        if self.torn_down {
            return None;
        }
        self.connection = self.connection.after(&event);
        match event {
            TransportEvent::Connected => {
                log::info!("Joined room {}", self.room);
                self.sync.set_connected(true);
                None
            }
            TransportEvent::Disconnected => {
                log::info!("Left room {}", self.room);
                self.sync.set_connected(false);
                None
            }
            TransportEvent::Error { message } => {
                log::warn!("Transport error: {}", message);
                self.sync.set_connected(false);
                None
            }
            TransportEvent::Message(text) => {
                self.sync
                    .handle_message(&text, now, &mut self.log, &mut self.presence)
            }
        }
    }

    /// Take pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.sync.take_outgoing()
    }

    /// Drain `transport`'s events into the board, then flush queued frames.
    ///
    /// Returns what the inbound messages changed.
    pub fn pump<T: Transport + ?Sized>(&mut self, transport: &mut T, now: Instant) -> Vec<SyncEvent> {
        let applied = transport
            .poll_events()
            .into_iter()
            .filter_map(|event| self.handle_transport_event(event, now))
            .collect();
        self.flush(transport);
        applied
    }

    /// Send every queued frame. Frames the transport refuses are dropped.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        for frame in self.sync.take_outgoing() {
            if let Err(e) = transport.send(&frame) {
                log::debug!("Dropping outbound frame: {}", e);
            }
        }
    }

    // --- Timers ---

    /// Run the presence sweep if the sweep interval has elapsed.
    ///
    /// Returns the number of evicted entries.
    pub fn tick(&mut self, now: Instant) -> usize {
        if self.torn_down {
            return 0;
        }
        let due = match self.last_sweep {
            Some(last) => now.saturating_duration_since(last) >= self.config.sweep_interval(),
            None => true,
        };
        if !due {
            return 0;
        }
        self.last_sweep = Some(now);
        self.presence.sweep(now, self.config.liveness_window())
    }

    /// Stop sweeping and go offline. The log stays readable.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.sync.set_connected(false);
        self.connection = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use kurbo::{Point, Vec2};
    use std::time::Duration;

    fn board(id: &str) -> Whiteboard {
        let config = SessionConfig::new().with_room(RoomId::parse("TEST01").unwrap());
        Whiteboard::with_participant_id(config, id)
    }

    fn online(id: &str) -> Whiteboard {
        let mut wb = board(id);
        wb.handle_transport_event(TransportEvent::Connected, Instant::now());
        wb
    }

    #[test]
    fn test_defaults_from_config() {
        let wb = board("me");
        assert_eq!(wb.room().as_str(), "TEST01");
        assert_eq!(wb.color(), "#ffffff");
        assert_eq!(wb.tool(), ToolKind::Pencil);
        assert_eq!(wb.connection_state(), ConnectionState::Disconnected);
        assert_eq!(wb.websocket_url().unwrap(), "ws://localhost:8080/ws?room=TEST01");
    }

    #[test]
    fn test_room_generated_when_absent() {
        let wb = Whiteboard::new(SessionConfig::new());
        assert_eq!(wb.room().as_str().len(), 6);
        assert_eq!(wb.config().room.as_ref(), Some(wb.room()));
    }

    #[test]
    fn test_draw_appends_and_queues() {
        let mut wb = online("me");
        let now = Instant::now();
        wb.handle_pointer_event(PointerEvent::Down { position: Point::new(0.0, 0.0) }, now);
        wb.handle_pointer_event(PointerEvent::Move { position: Point::new(10.0, 0.0) }, now);

        assert_eq!(wb.log().len(), 1);
        let kinds: Vec<_> = wb
            .take_outgoing()
            .iter()
            .map(|f| crate::protocol::Message::decode(f).unwrap().kind())
            .collect();
        assert_eq!(kinds, vec!["cursor_move", "draw_line"]);
    }

    #[test]
    fn test_offline_draw_is_local_only() {
        let mut wb = board("me");
        let now = Instant::now();
        wb.handle_pointer_event(PointerEvent::Down { position: Point::new(0.0, 0.0) }, now);
        wb.handle_pointer_event(PointerEvent::Move { position: Point::new(5.0, 5.0) }, now);

        assert_eq!(wb.log().len(), 1);
        assert!(wb.take_outgoing().is_empty());
    }

    #[test]
    fn test_hand_tool_moves_camera_only() {
        let mut wb = online("me");
        wb.set_tool(ToolKind::Hand);
        let now = Instant::now();
        wb.handle_pointer_event(PointerEvent::Down { position: Point::new(50.0, 50.0) }, now);
        wb.handle_pointer_event(PointerEvent::Move { position: Point::new(70.0, 40.0) }, now);

        assert!(wb.log().is_empty());
        assert_eq!(wb.camera().offset, Vec2::new(20.0, -10.0));
    }

    #[test]
    fn test_connection_lifecycle() {
        let mut wb = board("me");
        let now = Instant::now();
        wb.handle_transport_event(TransportEvent::Connected, now);
        assert_eq!(wb.connection_state(), ConnectionState::Connected);

        wb.handle_transport_event(TransportEvent::Error { message: "boom".into() }, now);
        assert_eq!(wb.connection_state(), ConnectionState::Error);
        wb.clear_board();
        assert!(wb.take_outgoing().is_empty());

        wb.handle_transport_event(TransportEvent::Disconnected, now);
        assert_eq!(wb.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_tick_sweeps_stale_cursors() {
        let mut wb = online("me");
        let start = Instant::now();
        wb.handle_transport_event(
            TransportEvent::Message(r#"{"type":"cursor_move","data":{"userId":"peer","x":1,"y":1}}"#.into()),
            start,
        );

        assert_eq!(wb.tick(start), 0);
        assert_eq!(wb.tick(start + Duration::from_millis(3500)), 1);
        assert!(wb.presence().is_empty());
    }

    #[test]
    fn test_tick_waits_for_sweep_interval() {
        let mut wb = online("me");
        let start = Instant::now();
        wb.handle_transport_event(
            TransportEvent::Message(r#"{"type":"cursor_move","data":{"userId":"peer","x":1,"y":1}}"#.into()),
            start,
        );

        assert_eq!(wb.tick(start + Duration::from_millis(3000)), 0);
        // Stale, but the next sweep is not due yet.
        assert_eq!(wb.tick(start + Duration::from_millis(3500)), 0);
        assert_eq!(wb.presence().len(), 1);
        assert_eq!(wb.tick(start + Duration::from_millis(4000)), 1);
    }

    #[test]
    fn test_pump_moves_frames_both_ways() {
        let mut wb = board("me");
        let mut transport = MemoryTransport::new();
        let now = Instant::now();

        transport.open();
        transport.deliver(r##"{"type":"draw_line","data":{"x0":0,"y0":0,"x1":1,"y1":1,"color":"#fff"}}"##);
        let applied = wb.pump(&mut transport, now);
        assert_eq!(applied, vec![SyncEvent::SegmentAppended]);
        assert_eq!(wb.connection_state(), ConnectionState::Connected);

        wb.clear_board();
        wb.pump(&mut transport, now);
        assert_eq!(transport.take_sent(), vec![r#"{"type":"clear_board"}"#.to_string()]);
        assert!(wb.log().is_empty());
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut wb = online("me");
        let now = Instant::now();
        wb.handle_transport_event(
            TransportEvent::Message(r#"{"type":"cursor_move","data":{"userId":"peer","x":1,"y":1}}"#.into()),
            now,
        );
        wb.teardown();

        assert!(wb.is_torn_down());
        assert_eq!(wb.connection_state(), ConnectionState::Disconnected);
        assert_eq!(wb.tick(now + Duration::from_secs(10)), 0);
        assert_eq!(
            wb.handle_transport_event(TransportEvent::Message(r#"{"type":"clear_board"}"#.into()), now),
            None
        );
    }
}
