//! Vello-based renderer implementation.

use crate::renderer::{RenderContext, Renderer, Surface, paint_frame};
use kurbo::{Affine, BezPath, Cap, Line, Point, Rect, RoundedRect, Stroke, Vec2};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use vello::Scene;

/// Font size of cursor name tags.
const LABEL_FONT_SIZE: f32 = 12.0;
/// Tag padding around the label text.
const LABEL_PADDING: Vec2 = Vec2::new(6.0, 3.0);
/// Tag offset from the pointer tip.
const LABEL_OFFSET: Vec2 = Vec2::new(14.0, 18.0);

/// A [`Surface`] recording into a Vello scene.
pub struct VelloSurface {
    /// The Vello scene being built.
    scene: Scene,
    /// Current transform.
    transform: Affine,
    /// Transforms pushed by `save`.
    stack: Vec<Affine>,
    /// Font context for cursor labels (system fonts).
    font_cx: FontContext,
    /// Layout context for cursor labels.
    layout_cx: LayoutContext<Brush>,
}

impl Default for VelloSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloSurface {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Current transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Draw `text` with its top-left corner at `origin`. Returns the text size,
    /// or `None` if no font could shape it.
    fn draw_label_text(&mut self, text: &str, origin: Point, color: Color) -> Option<(f64, f64)> {
        let brush = Brush::Solid(color);
        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(LABEL_FONT_SIZE));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Generic(parley::GenericFamily::SansSerif),
        )));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());

        let text_transform = Affine::translate(origin.to_vec2());
        let mut glyph_count = 0;

        // Adapted from Parley's vello example
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        glyph_count += 1;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(run.font())
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .font_size(run.font_size())
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        if glyph_count == 0 {
            return None;
        }
        Some((layout.width() as f64, layout.height() as f64))
    }
}

impl Surface for VelloSurface {
    fn clear(&mut self) {
        self.scene.reset();
        self.transform = Affine::IDENTITY;
        self.stack.clear();
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
    }

    fn translate(&mut self, offset: Vec2) {
        self.transform = self.transform * Affine::translate(offset);
    }

    fn stroke_segment(&mut self, line: Line, color: Color, width: f64) {
        let stroke = Stroke::new(width).with_caps(Cap::Round);
        self.scene.stroke(&stroke, self.transform, color, None, &line);
    }

    fn restore(&mut self) {
        self.transform = self.stack.pop().unwrap_or(Affine::IDENTITY);
    }

    /// The cursor is rendered as a small pointer arrow in the participant's
    /// color, with a name tag below and to the right.
    fn draw_cursor(&mut self, position: Point, color: Color, label: &str) {
        // Triangle: tip at position, pointing up-left
        let mut path = BezPath::new();
        path.move_to(position);
        path.line_to(Point::new(position.x, position.y + 18.0));
        path.line_to(Point::new(position.x + 14.0, position.y + 14.0));
        path.close_path();

        self.scene.fill(Fill::NonZero, self.transform, color, None, &path);
        // White stroke for visibility against any background
        let stroke = Stroke::new(1.5);
        self.scene.stroke(&stroke, self.transform, Color::WHITE, None, &path);

        // Text is laid out first so the tag can be sized to it; the tag is
        // appended afterwards, so glyphs go on a layer above it.
        let text_origin = position + LABEL_OFFSET + LABEL_PADDING;
        let mut text_scene = Scene::new();
        std::mem::swap(&mut self.scene, &mut text_scene);
        let size = self.draw_label_text(label, text_origin, Color::WHITE);
        std::mem::swap(&mut self.scene, &mut text_scene);

        let (width, height) = size.unwrap_or((label.len() as f64 * 7.0, LABEL_FONT_SIZE as f64 * 1.2));
        let tag_origin = position + LABEL_OFFSET;
        let tag = RoundedRect::from_rect(
            Rect::new(
                tag_origin.x,
                tag_origin.y,
                tag_origin.x + width + LABEL_PADDING.x * 2.0,
                tag_origin.y + height + LABEL_PADDING.y * 2.0,
            ),
            4.0,
        );
        self.scene.fill(Fill::NonZero, self.transform, color, None, &tag);
        self.scene.append(&text_scene, Some(self.transform));
    }
}

/// Vello-based renderer for GPU-accelerated 2D graphics.
#[derive(Default)]
pub struct VelloRenderer {
    surface: VelloSurface,
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        self.surface.scene()
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        self.surface.take_scene()
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        paint_frame(&mut self.surface, ctx);
    }
}
