//! Pointer input handling.
//!
//! Raw pointer/touch samples come in as [`PointerEvent`]s in screen space and
//! leave as [`InputAction`]s: camera pans, new segments, and cursor updates.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::drawing::LineSegment;
use crate::throttle::Throttle;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Default color for new strokes.
pub const DEFAULT_DRAW_COLOR: &str = "#ffffff";

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
    /// Pointer left the surface.
    Leave,
}

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Freehand drawing.
    #[default]
    Pencil,
    /// Drag to pan the camera.
    Hand,
}

/// State of a pointer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPhase {
    #[default]
    Idle,
    /// Button or finger is down.
    Active,
}

/// Effect of a pointer event, to be applied by the owner of the shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Shift the camera by a screen-space delta.
    Pan(Vec2),
    /// A new world-space segment to append and broadcast.
    Draw(LineSegment),
    /// Broadcast the local cursor at this screen position.
    Cursor(Point),
}

/// Tracks the pointer session and turns samples into actions.
#[derive(Debug, Clone)]
pub struct InputPipeline {
    phase: PointerPhase,
    /// Last sampled position, screen space.
    last_position: Point,
    tool: ToolKind,
    color: String,
    cursor_throttle: Throttle,
}

impl Default for InputPipeline {
    fn default() -> Self {
        Self::new(Throttle::default())
    }
}

impl InputPipeline {
    pub fn new(cursor_throttle: Throttle) -> Self {
        Self {
            phase: PointerPhase::Idle,
            last_position: Point::ZERO,
            tool: ToolKind::default(),
            color: DEFAULT_DRAW_COLOR.to_string(),
            cursor_throttle,
        }
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    pub fn last_position(&self) -> Point {
        self.last_position
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    /// Process a pointer event.
    ///
    /// `camera` is only read, to convert positions to world space; pans come
    /// back as [`InputAction::Pan`].
    pub fn handle_pointer_event(
        &mut self,
        event: PointerEvent,
        camera: &Camera,
        now: Instant,
    ) -> Vec<InputAction> {
        match event {
            PointerEvent::Down { position } => {
                self.last_position = position;
                self.phase = PointerPhase::Active;
                // Always sent so a short tap still shows up remotely.
                vec![self.cursor_throttle.force_fire(now, InputAction::Cursor(position))]
            }
            PointerEvent::Move { position } => {
                let mut actions = Vec::with_capacity(2);
                if self.phase == PointerPhase::Active {
                    match self.tool {
                        ToolKind::Hand => {
                            actions.push(InputAction::Pan(position - self.last_position));
                        }
                        ToolKind::Pencil => {
                            let start = camera.screen_to_world(self.last_position);
                            let end = camera.screen_to_world(position);
                            actions.push(InputAction::Draw(LineSegment::new(
                                start,
                                end,
                                self.color.clone(),
                            )));
                        }
                    }
                }
                if let Some(cursor) = self.cursor_throttle.try_fire(now, InputAction::Cursor(position)) {
                    actions.push(cursor);
                }
                self.last_position = position;
                actions
            }
            PointerEvent::Up { .. } | PointerEvent::Leave => {
                self.phase = PointerPhase::Idle;
                Vec::new()
            }
        }
    }
}
