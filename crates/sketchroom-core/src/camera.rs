//! Camera module for the per-client pan transform.
//!
//! The camera is never replicated: every participant looks at its own region
//! of the shared world.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view offset for the canvas.
///
/// Screen space is what the pointer reports; world space is what gets stored
/// in the drawing log and sent over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan).
    pub offset: Vec2,
}

impl Camera {
    /// Create a camera at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera at the given offset.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            offset: Vec2::new(x, y),
        }
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        to_world(screen_point, self)
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        to_screen(world_point, self)
    }

    /// Pan the camera by a delta in screen coordinates.
    ///
    /// A screen delta equals a world delta since the camera only translates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Reset camera to the origin.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
    }
}

/// `(sx - cx, sy - cy)`.
pub fn to_world(screen: Point, camera: &Camera) -> Point {
    screen - camera.offset
}

/// `(wx + cx, wy + cy)`.
pub fn to_screen(world: Point, camera: &Camera) -> Point {
    world + camera.offset
}
