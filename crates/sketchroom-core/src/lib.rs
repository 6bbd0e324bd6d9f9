//! SketchRoom Core Library
//!
//! Platform-agnostic state-synchronization engine for the SketchRoom shared
//! canvas: the camera transform, the append-only drawing log, cursor presence,
//! pointer input, the wire protocol and the room transport.

pub mod camera;
pub mod config;
pub mod drawing;
pub mod input;
pub mod presence;
pub mod protocol;
pub mod sync;
pub mod throttle;
pub mod transport;
pub mod whiteboard;

pub use camera::{Camera, to_screen, to_world};
pub use config::{ConfigError, RoomId, SessionConfig, invite_link, room_from_url};
pub use drawing::{DrawingLog, LineSegment};
pub use input::{InputAction, InputPipeline, PointerEvent, PointerPhase, ToolKind};
pub use presence::{PresenceEntry, PresenceTable};
pub use protocol::{CursorUpdate, Message, ProtocolError};
pub use sync::{SyncEvent, SyncHandler, generate_participant_id};
pub use throttle::Throttle;
pub use transport::{
    ConnectionState, MemoryTransport, PlatformWebSocket, Transport, TransportError, TransportEvent,
};
pub use whiteboard::Whiteboard;
