//! Vello-based renderer implementation.

use crate::renderer::{RenderContext, Renderer};
use kurbo::{Affine, Cap, Circle, Join, Stroke};
use peniko::{Color, Fill};
use talkboard_core::stroke::Stroke as BoardStroke;
use vello::Scene;

/// Vello-based renderer for GPU-accelerated 2D graphics.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
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

    fn render_stroke(&mut self, stroke: &BoardStroke, width: f64, transform: Affine) {
        let color: Color = stroke.color.into();
        if stroke.len() == 1 {
            // A tap has no segments to stroke; draw it as a dot.
            let dot = Circle::new(stroke.first(), width / 2.0);
            self.scene.fill(Fill::NonZero, transform, color, None, &dot);
            return;
        }

        let style = Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round);
        self.scene
            .stroke(&style, transform, color, None, &stroke.to_path());
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.scene.reset();
        let transform = Affine::scale(ctx.scale_factor);
        let width = ctx.canvas.style().width;

        for stroke in ctx.canvas.visible_strokes() {
            self.render_stroke(stroke, width, transform);
        }
    }
}
