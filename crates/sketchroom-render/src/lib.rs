//! SketchRoom Render Library
//!
//! The per-frame paint pass, the frame scheduler and the surface abstraction.
//! The default implementation uses Vello for GPU-accelerated rendering.

mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use renderer::{
    DEFAULT_CURSOR_COLOR, DEFAULT_STROKE_COLOR, FrameHandle, FrameLoop, RenderContext,
    RenderResult, Renderer, RendererError, Surface, paint_frame, parse_css_color, render,
};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::{VelloRenderer, VelloSurface};
