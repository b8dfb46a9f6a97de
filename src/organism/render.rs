//! Draw pass: background, connections, particles, discovery effects.

use super::effects::PULSE_LIFE;
use super::Organism;
use crate::discovery::{quadratic_point, NodeState};
use crate::draw::Canvas;
use crate::particle::Particle;
use crate::visuals::{GlowMode, Hsl, Rgba};
use glam::Vec2;

/// Motes drawn along each flow stream.
const FLOW_MOTES: usize = 4;

pub(super) fn draw<C: Canvas>(org: &Organism, canvas: &mut C) {
    let profile = org.circadian.profile();
    canvas.clear(profile.background);

    let positions = org.node_positions();
    let accent = profile.accent;

    draw_connections(org, canvas, &positions, accent);

    let glow_mode = org.quality.glow_mode();
    for p in org.particles.iter() {
        draw_particle(org, canvas, p, glow_mode, profile.glow);
    }

    draw_node_hints(org, canvas, &positions, accent);

    for wave in org.discovery.shockwaves() {
        let color = accent.lighten(10.0).to_rgba(0.5 * wave.amplitude());
        canvas.stroke_circle(wave.origin, wave.radius(), 2.0, color);
    }

    if let Some(age) = org.completion_pulse() {
        let t = age / PULSE_LIFE;
        let color = accent.to_rgba(0.35 * (1.0 - t));
        for &node in org.discovery.discovered() {
            if let Some(pos) = positions[node] {
                canvas.stroke_circle(pos, 8.0 + t * 60.0, 1.5, color);
            }
        }
    }

    if let Some(pos) = org.focus.and_then(|node| positions[node]) {
        canvas.stroke_circle(pos, 16.0, 1.5, Rgba::WHITE.with_alpha(0.8));
    }
}

fn draw_connections<C: Canvas>(
    org: &Organism,
    canvas: &mut C,
    positions: &[Option<Vec2>],
    accent: Hsl,
) {
    for trail in org.discovery.trails() {
        if let (Some(a), Some(b)) = (positions[trail.from], positions[trail.to]) {
            canvas.stroke_line(a, b, 1.5, accent.to_rgba(0.6 * trail.alpha()));
        }
    }

    let line = accent.to_rgba(0.12);
    let mote = accent.lighten(15.0).to_rgba(0.7);
    for flow in org.discovery.flows() {
        let (Some(a), Some(b)) = (positions[flow.from], positions[flow.to]) else {
            continue;
        };
        let c = flow.control_point(a, b);
        canvas.stroke_quadratic(a, c, b, 1.0, line);
        for k in 0..FLOW_MOTES {
            let t = (flow.phase + k as f32 / FLOW_MOTES as f32).fract();
            canvas.fill_circle(quadratic_point(a, c, b, t), 1.2, mote);
        }
    }
}

fn draw_particle<C: Canvas>(
    org: &Organism,
    canvas: &mut C,
    p: &Particle,
    glow_mode: GlowMode,
    glow: f32,
) {
    let hsl = Hsl::new(p.hue, p.saturation, p.lightness);
    let alpha = p.alpha * p.life;
    let color = hsl.to_rgba(alpha);

    let segments = p.trail().len().saturating_sub(1).max(1) as f32;
    for (i, (&from, &to)) in p.trail().zip(p.trail().skip(1)).enumerate() {
        let fade = (i + 1) as f32 / segments;
        canvas.stroke_line(from, to, p.radius * 0.6, color.fade(0.35 * fade));
    }

    if p.is_memory() {
        let pulse = p
            .memory
            .and_then(|node| org.graph.node(node))
            .map(|n| 0.5 + 0.5 * n.pulse_phase.sin())
            .unwrap_or(0.5);
        let radius = p.radius * (3.0 + pulse) * (0.6 + glow);
        draw_glow(org, canvas, glow_mode, p.pos, radius, color.fade(0.6));
    }

    canvas.fill_circle(p.pos, p.radius, color);
}

/// Soft halo in the current quality mode.
fn draw_glow<C: Canvas>(
    org: &Organism,
    canvas: &mut C,
    mode: GlowMode,
    center: Vec2,
    radius: f32,
    color: Rgba,
) {
    match mode {
        GlowMode::Gradient => canvas.radial_gradient(center, radius, color, Rgba::TRANSPARENT),
        GlowMode::Sprite => canvas.blit_sprite(&org.sprite, center, radius, color),
    }
}

/// Pre-discovery glow: warmth and dwell progress on undiscovered nodes, and the
/// hint halo on the undiscovered node nearest the pointer (or the center).
fn draw_node_hints<C: Canvas>(
    org: &Organism,
    canvas: &mut C,
    positions: &[Option<Vec2>],
    accent: Hsl,
) {
    let glow_mode = org.quality.glow_mode();
    for (node, pos) in positions.iter().enumerate() {
        let Some(pos) = *pos else { continue };
        let warmth = org.discovery.warmth(node);
        if warmth > 0.0 && !org.discovery.is_discovered(node) {
            let inner = accent.to_rgba(0.35 * warmth);
            draw_glow(org, canvas, glow_mode, pos, 10.0 + 20.0 * warmth, inner);
        }
        if org.discovery.state(node) == NodeState::Dwelling {
            let progress = org.discovery.dwell_progress();
            canvas.stroke_circle(pos, 6.0 + 14.0 * progress, 1.5, accent.to_rgba(0.8));
        }
    }

    let level = org.discovery.hint_level();
    if level == 0 {
        return;
    }
    let reference = org
        .snapshot
        .position
        .map(|_| org.snapshot.smoothed)
        .unwrap_or(org.center);
    let nearest = positions
        .iter()
        .enumerate()
        .filter(|(node, _)| !org.discovery.is_discovered(*node))
        .filter_map(|(node, pos)| pos.map(|p| (node, p)))
        .min_by(|a, b| {
            a.1.distance_squared(reference)
                .total_cmp(&b.1.distance_squared(reference))
        });
    if let Some((_, pos)) = nearest {
        let strength = level as f32 / 3.0;
        let inner = accent.lighten(10.0).to_rgba(0.25 * strength);
        draw_glow(org, canvas, glow_mode, pos, 18.0 + 18.0 * strength, inner);
    }
}
