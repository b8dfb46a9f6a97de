//! Immediate-mode drawing seam.
//!
//! The organism draws through [`Canvas`], a small set of 2D primitives. Hosts
//! implement it over whatever surface they have; [`DrawList`] records the
//! calls so a GPU host can batch them (and tests can inspect them).

use crate::visuals::{GlowSprite, Rgb, Rgba};
use glam::Vec2;

/// A 2D surface in viewport pixels, origin top-left.
pub trait Canvas {
    /// Surface size in pixels.
    fn size(&self) -> Vec2;

    /// Fill the whole surface.
    fn clear(&mut self, color: Rgb);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);

    /// Radial gradient disc from `inner` at the center to `outer` at `radius`.
    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: Rgba, outer: Rgba);

    /// Additively blit the glow sprite scaled to `radius`, tinted by `tint`.
    fn blit_sprite(&mut self, sprite: &GlowSprite, center: Vec2, radius: f32, tint: Rgba);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba);

    /// Quadratic Bezier from `from` to `to` through control point `control`.
    fn stroke_quadratic(&mut self, from: Vec2, control: Vec2, to: Vec2, width: f32, color: Rgba);

    /// Circle outline.
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba);
}

/// One recorded primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgb),
    Circle {
        center: Vec2,
        radius: f32,
        color: Rgba,
    },
    Gradient {
        center: Vec2,
        radius: f32,
        inner: Rgba,
        outer: Rgba,
    },
    Sprite {
        center: Vec2,
        radius: f32,
        tint: Rgba,
    },
    Line {
        from: Vec2,
        to: Vec2,
        width: f32,
        color: Rgba,
    },
    Quadratic {
        from: Vec2,
        control: Vec2,
        to: Vec2,
        width: f32,
        color: Rgba,
    },
    Ring {
        center: Vec2,
        radius: f32,
        width: f32,
        color: Rgba,
    },
}

/// A [`Canvas`] that records commands.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    size: Vec2,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            commands: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop recorded commands, keeping the allocation.
    pub fn reset(&mut self) {
        self.commands.clear();
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Canvas for DrawList {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, color: Rgb) {
        self.commands.clear();
        self.push(DrawCommand::Clear(color));
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: Rgba, outer: Rgba) {
        self.push(DrawCommand::Gradient {
            center,
            radius,
            inner,
            outer,
        });
    }

    fn blit_sprite(&mut self, _sprite: &GlowSprite, center: Vec2, radius: f32, tint: Rgba) {
        self.push(DrawCommand::Sprite {
            center,
            radius,
            tint,
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba) {
        self.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn stroke_quadratic(&mut self, from: Vec2, control: Vec2, to: Vec2, width: f32, color: Rgba) {
        self.push(DrawCommand::Quadratic {
            from,
            control,
            to,
            width,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba) {
        self.push(DrawCommand::Ring {
            center,
            radius,
            width,
            color,
        });
    }
}
