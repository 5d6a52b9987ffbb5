//! Renderer trait abstraction.

use kurbo::{Point, Size};
use peniko::Color;
use talkboard_core::canvas::CanvasView;
use talkboard_core::style::StrokeColor;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a CanvasView,
    /// Viewport size in physical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a CanvasView, viewport_size: Size) -> Self {
        Self {
            canvas,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::WHITE,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Stroke width in physical pixels.
    pub fn stroke_width(&self) -> f64 {
        self.canvas.style().width * self.scale_factor
    }
}

/// Trait for rendering backends.
///
/// Implementations can use Vello, wgpu directly, or other rendering engines.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    ///
    /// Called once per frame; stored strokes are drawn first, then the
    /// stroke in progress.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Polyline {
        points: Vec<Point>,
        color: StrokeColor,
        width: f64,
    },
}

/// Renderer that records draw commands instead of rasterizing.
///
/// Handy for headless shells and for checking what a frame would draw.
#[derive(Debug, Default)]
pub struct DisplayListRenderer {
    commands: Vec<DrawCommand>,
}

impl DisplayListRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded by the last `build_scene`.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl Renderer for DisplayListRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.commands.clear();
        let scale = ctx.scale_factor;
        let width = ctx.stroke_width();
        for stroke in ctx.canvas.visible_strokes() {
            self.commands.push(DrawCommand::Polyline {
                points: stroke
                    .points()
                    .iter()
                    .map(|p| Point::new(p.x * scale, p.y * scale))
                    .collect(),
                color: stroke.color,
                width,
            });
        }
    }
}
