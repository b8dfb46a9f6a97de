use bytemuck::{Pod, Zeroable};
use organism::discovery::quadratic_point;
use organism::draw::DrawCommand;
use organism::visuals::{Rgb, Rgba};

pub const SHADER_SOURCE: &str = include_str!("shader.wgsl");

pub const KIND_DISC: u32 = 0;
pub const KIND_GLOW: u32 = 1;
pub const KIND_RING: u32 = 2;
pub const KIND_SEGMENT: u32 = 3;

/// Line segments per quadratic curve.
const CURVE_SEGMENTS: usize = 12;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Instance {
    pub a: [f32; 2],
    pub b: [f32; 2],
    pub color: [f32; 4],
    pub radius: f32,
    pub width: f32,
    pub kind: u32,
    pub _pad: f32,
}

impl Instance {
    fn point(kind: u32, center: glam::Vec2, radius: f32, width: f32, color: Rgba) -> Self {
        Self {
            a: center.to_array(),
            b: center.to_array(),
            color: color.to_array(),
            radius,
            width,
            kind,
            _pad: 0.0,
        }
    }

    fn segment(from: glam::Vec2, to: glam::Vec2, width: f32, color: Rgba) -> Self {
        Self {
            a: from.to_array(),
            b: to.to_array(),
            color: color.to_array(),
            radius: 0.0,
            width,
            kind: KIND_SEGMENT,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct Uniforms {
    pub viewport: [f32; 2],
    pub time: f32,
    pub _padding: f32,
}

/// Flatten recorded draw commands into instances. Returns the clear color.
pub fn build_instances(commands: &[DrawCommand], out: &mut Vec<Instance>) -> Option<Rgb> {
    out.clear();
    let mut clear = None;
    for command in commands {
        match *command {
            DrawCommand::Clear(color) => {
                out.clear();
                clear = Some(color);
            }
            DrawCommand::Circle {
                center,
                radius,
                color,
            } => out.push(Instance::point(KIND_DISC, center, radius, 0.0, color)),
            DrawCommand::Gradient {
                center,
                radius,
                inner,
                ..
            } => out.push(Instance::point(KIND_GLOW, center, radius, 0.0, inner)),
            DrawCommand::Sprite {
                center,
                radius,
                tint,
            } => out.push(Instance::point(KIND_GLOW, center, radius, 0.0, tint)),
            DrawCommand::Ring {
                center,
                radius,
                width,
                color,
            } => out.push(Instance::point(KIND_RING, center, radius, width, color)),
            DrawCommand::Line {
                from,
                to,
                width,
                color,
            } => out.push(Instance::segment(from, to, width, color)),
            DrawCommand::Quadratic {
                from,
                control,
                to,
                width,
                color,
            } => {
                let mut last = from;
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    let next = quadratic_point(from, control, to, t);
                    out.push(Instance::segment(last, next, width, color));
                    last = next;
                }
            }
        }
    }
    clear
}
