//! Renderer trait abstraction and the per-frame paint pass.

use kurbo::{Line, Point, Vec2};
use peniko::Color;
use sketchroom_core::config::DEFAULT_LINE_WIDTH;
use sketchroom_core::{Camera, LineSegment, PresenceEntry, Whiteboard};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Stroke color used when a segment's color cannot be parsed.
pub const DEFAULT_STROKE_COLOR: Color = Color::from_rgba8(255, 255, 255, 255);
/// Cursor color used when a participant sent none.
pub const DEFAULT_CURSOR_COLOR: Color = Color::from_rgba8(239, 68, 68, 255);

/// Parse a CSS hex color: `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_css_color(s: &str) -> RenderResult<Color> {
    let invalid = || RendererError::InvalidColor(s.to_string());
    let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
    // from_str_radix alone would take a leading '+'.
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |i: usize, width: usize| -> RenderResult<u8> {
        let digits = &hex[i * width..(i + 1) * width];
        let value = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
        // #rgb: each digit is doubled.
        Ok(if width == 1 { value * 17 } else { value })
    };
    match hex.len() {
        3 => Ok(Color::from_rgba8(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?, 255)),
        6 => Ok(Color::from_rgba8(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?, 255)),
        8 => Ok(Color::from_rgba8(
            channel(0, 2)?,
            channel(1, 2)?,
            channel(2, 2)?,
            channel(3, 2)?,
        )),
        _ => Err(invalid()),
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Local camera; only the log is drawn through it.
    pub camera: Camera,
    /// Drawing log snapshot, painted in order.
    pub segments: &'a [LineSegment],
    /// Remote cursors, sorted by participant id.
    pub cursors: Vec<&'a PresenceEntry>,
    /// Stroke width in pixels.
    pub line_width: f64,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(
        camera: Camera,
        segments: &'a [LineSegment],
        cursors: impl IntoIterator<Item = &'a PresenceEntry>,
    ) -> Self {
        let mut cursors: Vec<_> = cursors.into_iter().collect();
        cursors.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        Self {
            camera,
            segments,
            cursors,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }

    /// Snapshot of a whiteboard's current state.
    pub fn from_board(board: &'a Whiteboard) -> Self {
        Self::new(
            *board.camera(),
            board.log().snapshot(),
            board.presence().all(),
        )
        .with_line_width(board.config().line_width)
    }

    /// Set the stroke width.
    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }
}

/// A 2D drawing target.
///
/// Mirrors the small subset of a canvas context the paint pass needs.
pub trait Surface {
    /// Wipe everything drawn so far and reset the transform.
    fn clear(&mut self);

    /// Push the current transform.
    fn save(&mut self);

    /// Translate subsequent drawing.
    fn translate(&mut self, offset: Vec2);

    /// Stroke a line with round caps.
    fn stroke_segment(&mut self, line: Line, color: Color, width: f64);

    /// Pop the transform pushed by the matching [`Surface::save`].
    fn restore(&mut self);

    /// Draw a pointer glyph with a name tag, in screen space.
    fn draw_cursor(&mut self, position: Point, color: Color, label: &str);
}

/// Paint one frame: the log through the camera, then the cursor overlay.
pub fn paint_frame<S: Surface + ?Sized>(surface: &mut S, ctx: &RenderContext) {
    surface.clear();

    surface.save();
    surface.translate(ctx.camera.offset);
    for segment in ctx.segments {
        let color = parse_css_color(&segment.color).unwrap_or(DEFAULT_STROKE_COLOR);
        surface.stroke_segment(segment.as_line(), color, ctx.line_width);
    }
    surface.restore();

    for entry in &ctx.cursors {
        let color = entry
            .color
            .as_deref()
            .and_then(|c| parse_css_color(c).ok())
            .unwrap_or(DEFAULT_CURSOR_COLOR);
        surface.draw_cursor(entry.position, color, &entry.label());
    }
}

/// Paint a whiteboard's current state.
pub fn render<S: Surface + ?Sized>(surface: &mut S, board: &Whiteboard) {
    paint_frame(surface, &RenderContext::from_board(board));
}

/// Trait for rendering backends.
///
/// Implementations can use Vello or other rendering engines.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    ///
    /// This method is called once per frame and should prepare all drawing commands.
    fn build_scene(&mut self, ctx: &RenderContext);
}

/// Token for a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Redraw scheduler driven by the display's refresh signal.
///
/// A frame only runs if one was requested; every frame that runs requests
/// the next, so once started the loop keeps going until cancelled.
#[derive(Debug, Default)]
pub struct FrameLoop {
    next_id: u64,
    pending: Option<FrameHandle>,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a frame on the next refresh. Replaces any pending request.
    pub fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(handle);
        handle
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of frames painted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Handle a display refresh: run `paint` if a frame is pending and
    /// request the next one.
    ///
    /// Returns whether a frame was painted.
    pub fn on_display_refresh<F: FnOnce()>(&mut self, paint: F) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        paint();
        self.frames += 1;
        self.request_frame();
        true
    }

    /// Drop the pending request; the loop stops.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchroom_core::{PointerEvent, PresenceTable, RoomId, SessionConfig, TransportEvent};
    use std::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Save,
        Translate(Vec2),
        Stroke(Line, [u8; 4], f64),
        Restore,
        Cursor(Point, [u8; 4], String),
    }

    #[derive(Default)]
    struct RecordingSurface {
        ops: Vec<Op>,
    }

    fn rgba(color: Color) -> [u8; 4] {
        let c = color.to_rgba8();
        [c.r, c.g, c.b, c.a]
    }

    impl Surface for RecordingSurface {
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn save(&mut self) {
            self.ops.push(Op::Save);
        }
        fn translate(&mut self, offset: Vec2) {
            self.ops.push(Op::Translate(offset));
        }
        fn stroke_segment(&mut self, line: Line, color: Color, width: f64) {
            self.ops.push(Op::Stroke(line, rgba(color), width));
        }
        fn restore(&mut self) {
            self.ops.push(Op::Restore);
        }
        fn draw_cursor(&mut self, position: Point, color: Color, label: &str) {
            self.ops.push(Op::Cursor(position, rgba(color), label.to_string()));
        }
    }

    #[test]
    fn test_parse_css_color() {
        assert_eq!(rgba(parse_css_color("#ef4444").unwrap()), [239, 68, 68, 255]);
        assert_eq!(rgba(parse_css_color("#fff").unwrap()), [255, 255, 255, 255]);
        assert_eq!(rgba(parse_css_color("#00000080").unwrap()), [0, 0, 0, 128]);
        assert!(parse_css_color("red").is_err());
        assert!(parse_css_color("#12345").is_err());
        assert!(parse_css_color("#gggggg").is_err());
        assert!(parse_css_color("#éé").is_err());
        assert!(parse_css_color("#+f+f+f").is_err());
        assert!(parse_css_color("#+ff").is_err());
    }

    #[test]
    fn test_paint_order() {
        let segments = vec![
            LineSegment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0), "#ff0000"),
            LineSegment::new(Point::new(1.0, 0.0), Point::new(2.0, 0.0), "#00ff00"),
        ];
        let mut presence = PresenceTable::new();
        presence.upsert("zed000000", Point::new(5.0, 5.0), None, Instant::now());
        presence.upsert("amy000000", Point::new(9.0, 9.0), Some("#0000ff".into()), Instant::now());

        let ctx = RenderContext::new(Camera::at(10.0, 20.0), &segments, presence.all());
        let mut surface = RecordingSurface::default();
        paint_frame(&mut surface, &ctx);

        assert_eq!(
            surface.ops,
            vec![
                Op::Clear,
                Op::Save,
                Op::Translate(Vec2::new(10.0, 20.0)),
                Op::Stroke(segments[0].as_line(), [255, 0, 0, 255], 3.0),
                Op::Stroke(segments[1].as_line(), [0, 255, 0, 255], 3.0),
                Op::Restore,
                Op::Cursor(Point::new(9.0, 9.0), [0, 0, 255, 255], "User amy0".into()),
                Op::Cursor(Point::new(5.0, 5.0), [239, 68, 68, 255], "User zed0".into()),
            ]
        );
    }

    #[test]
    fn test_bad_colors_fall_back() {
        let segments = vec![LineSegment::new(Point::ZERO, Point::new(1.0, 1.0), "chartreuse")];
        let mut presence = PresenceTable::new();
        presence.upsert("peer00000", Point::ZERO, Some("nope".into()), Instant::now());

        let ctx = RenderContext::new(Camera::new(), &segments, presence.all());
        let mut surface = RecordingSurface::default();
        paint_frame(&mut surface, &ctx);

        assert!(surface.ops.contains(&Op::Stroke(segments[0].as_line(), [255, 255, 255, 255], 3.0)));
        assert!(surface
            .ops
            .contains(&Op::Cursor(Point::ZERO, [239, 68, 68, 255], "User peer".into())));
    }

    #[test]
    fn test_render_board() {
        let config = SessionConfig::new().with_room(RoomId::parse("PAINT1").unwrap());
        let mut board = Whiteboard::with_participant_id(config, "me");
        let now = Instant::now();
        board.handle_transport_event(TransportEvent::Connected, now);
        board.handle_pointer_event(PointerEvent::Down { position: Point::new(0.0, 0.0) }, now);
        board.handle_pointer_event(PointerEvent::Move { position: Point::new(4.0, 0.0) }, now);

        let mut surface = RecordingSurface::default();
        render(&mut surface, &board);

        let strokes = surface.ops.iter().filter(|op| matches!(op, Op::Stroke(..))).count();
        let cursors = surface.ops.iter().filter(|op| matches!(op, Op::Cursor(..))).count();
        assert_eq!(strokes, 1);
        assert_eq!(cursors, 0);
    }

    #[test]
    fn test_frame_loop_runs_only_when_requested() {
        let mut frames = FrameLoop::new();
        let mut painted = 0;

        assert!(!frames.on_display_refresh(|| painted += 1));
        assert_eq!(painted, 0);

        let first = frames.request_frame();
        assert!(frames.on_display_refresh(|| painted += 1));
        assert!(frames.is_running());
        assert_ne!(frames.pending(), Some(first));

        assert!(frames.on_display_refresh(|| painted += 1));
        assert_eq!(painted, 2);
        assert_eq!(frames.frames(), 2);
    }

    #[test]
    fn test_frame_loop_cancel() {
        let mut frames = FrameLoop::new();
        frames.request_frame();
        frames.cancel();

        let mut painted = false;
        assert!(!frames.on_display_refresh(|| painted = true));
        assert!(!painted);
        assert!(!frames.is_running());
    }
}
