//! Time-driven effects layered over physics: letterform text, idle motes,
//! blooms, the completion ambience and the guided tour.

use super::{DiscoveredPosition, Organism};
use crate::glyphs::text_to_glyph_positions;
use crate::memory::NodeIndex;
use crate::particle::{ParticleHandle, ParticleSpec, PinTarget};
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::{debug, info};

/// Seconds a completion pulse ring stays visible.
pub(super) const PULSE_LIFE: f32 = 2.0;

/// Work queued on the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Deferred {
    IntroComplete,
    /// Start releasing the formation with this serial.
    ReleaseText(u64),
    /// Advance the tour with this serial.
    TourStep(u64),
}

/// Particles currently pulled into a label.
#[derive(Debug, Clone)]
pub(super) struct TextFormation {
    pub label: String,
    pub serial: u64,
    pub pinned: Vec<ParticleHandle>,
    /// Clock time the release began.
    pub releasing: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct IdleState {
    pub emit_timer: f32,
    /// Clock time of the last idle label.
    pub last_text: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct Bloom {
    /// Pointer travel accumulated toward the next bloom, in pixels.
    pub energy: f32,
    pub generation: u32,
}

#[derive(Debug, Clone, Default)]
pub(super) struct Completion {
    pub active: bool,
    /// Rotation of work anchors around the root, radians.
    pub orbit_angle: f32,
    pub pulse_timer: f32,
    /// Age of the current network pulse.
    pub pulse_age: Option<f32>,
    /// Fractional stellar-wind motes owed.
    pub wind: f32,
}

impl Completion {
    pub fn begin(&mut self) {
        if !self.active {
            self.active = true;
            self.pulse_age = Some(0.0);
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Tour {
    pub order: Vec<NodeIndex>,
    pub step: usize,
    pub serial: u64,
}

impl Organism {
    pub(super) fn is_idle(&self) -> bool {
        self.snapshot.idle_time >= self.config.effects.idle_threshold
    }

    fn spawn(&mut self, pos: Vec2, spec: &ParticleSpec) -> bool {
        self.particles.add(pos, spec).is_some()
    }

    // ---- text formation ----

    /// Pull free particles into `label`'s letterforms. Replaces any formation
    /// in progress.
    pub(super) fn start_text(&mut self, label: &str) {
        self.clear_text();
        if self.destroyed {
            return;
        }

        let targets = text_to_glyph_positions(
            label,
            self.config.effects.text_size,
            self.width.max(0.0) as u32,
            self.height.max(0.0) as u32,
        );
        if targets.is_empty() {
            return;
        }

        let force = self.config.physics.text_force;
        let mut pinned = Vec::with_capacity(targets.len());
        let free = self
            .particles
            .iter_mut()
            .filter(|p| !p.is_memory() && p.decay == 0.0);
        for (p, &target) in free.zip(&targets) {
            p.pin = Some(PinTarget { target, force });
            pinned.push(p.handle());
        }

        self.text_serial += 1;
        let serial = self.text_serial;
        self.defer(self.config.effects.text_hold, Deferred::ReleaseText(serial));
        debug!(label, points = targets.len(), pinned = pinned.len(), "text formation");
        self.text = Some(TextFormation {
            label: label.to_string(),
            serial,
            pinned,
            releasing: None,
        });
    }

    pub(super) fn begin_text_release(&mut self, serial: u64) {
        let clock = self.clock;
        if let Some(text) = self.text.as_mut().filter(|t| t.serial == serial) {
            text.releasing.get_or_insert(clock);
        }
    }

    fn clear_text(&mut self) {
        if let Some(text) = self.text.take() {
            for &handle in &text.pinned {
                if let Some(p) = self.particles.get_mut(handle) {
                    p.pin = None;
                }
            }
        }
    }

    /// Fade the pull of a releasing formation to zero.
    pub(super) fn update_text(&mut self) {
        let Some(start) = self.text.as_ref().and_then(|t| t.releasing) else {
            return;
        };
        let duration = self.config.effects.text_release.max(f32::EPSILON);
        let t = (self.clock - start) / duration;
        if t >= 1.0 {
            self.clear_text();
            return;
        }

        let force = self.config.physics.text_force * (1.0 - t);
        if let Some(text) = &self.text {
            for &handle in &text.pinned {
                if let Some(pin) = self.particles.get_mut(handle).and_then(|p| p.pin.as_mut()) {
                    pin.force = force;
                }
            }
        }
    }

    // ---- idle ----

    pub(super) fn update_idle(&mut self, dt: f32) {
        if !self.is_idle() {
            self.idle.emit_timer = 0.0;
            return;
        }

        let interval = self.config.effects.idle_emit_interval.max(0.05);
        self.idle.emit_timer += dt;
        while self.idle.emit_timer >= interval {
            self.idle.emit_timer -= interval;
            self.emit_idle_mote();
        }

        let effects = &self.config.effects;
        let cooled = self
            .idle
            .last_text
            .map_or(true, |last| self.clock - last >= effects.idle_text_cooldown);
        if self.snapshot.idle_time >= effects.idle_text_threshold && self.text.is_none() && cooled
        {
            let label = self
                .discovery
                .discovered()
                .choose(&mut self.rng)
                .and_then(|&node| self.graph.node(node))
                .map(|n| n.label().to_string());
            if let Some(label) = label {
                self.idle.last_text = Some(self.clock);
                self.start_text(&label);
            }
        }
    }

    fn emit_idle_mote(&mut self) {
        let placed: Vec<NodeIndex> = self
            .graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.anchor.is_some())
            .map(|(i, _)| i)
            .collect();
        let Some(origin) = placed
            .choose(&mut self.rng)
            .and_then(|&node| self.node_position(node))
        else {
            return;
        };

        let accent = self.circadian.profile().accent;
        let velocity = Vec2::from_angle(self.rng.gen_range(0.0..TAU)) * self.rng.gen_range(0.2..0.6);
        let spec = ParticleSpec {
            radius: self.rng.gen_range(0.8..1.6),
            hue: accent.h,
            saturation: accent.s,
            lightness: accent.l,
            alpha: 0.6,
            decay: 0.35,
            velocity,
            ..Default::default()
        };
        self.spawn(origin, &spec);
    }

    // ---- blooms ----

    /// Accumulate pointer travel; every threshold crossing spawns a burst and
    /// advances the generation.
    pub(super) fn accumulate_bloom(&mut self, dt: f32) {
        if self.snapshot.position.is_none() {
            return;
        }
        let threshold = self.config.effects.bloom_threshold;
        if threshold <= 0.0 {
            return;
        }
        self.bloom.energy += self.snapshot.velocity.length() * dt;
        while self.bloom.energy >= threshold {
            self.bloom.energy -= threshold;
            self.bloom.generation += 1;
            self.audio.set_generation(self.bloom.generation);
            self.spawn_bloom(self.snapshot.smoothed);
        }
    }

    fn spawn_bloom(&mut self, at: Vec2) {
        let generation = self.bloom.generation;
        let primary = self.circadian.profile().primary;
        let hue = primary.h + generation as f32 * 18.0;
        let radius = (1.2 + 0.15 * generation as f32).min(3.0);
        let decay = 0.15 + 0.02 * generation.min(10) as f32;

        let mut spawned = 0;
        for _ in 0..self.config.effects.bloom_size {
            let velocity =
                Vec2::from_angle(self.rng.gen_range(0.0..TAU)) * self.rng.gen_range(0.5..2.5);
            let spec = ParticleSpec {
                radius,
                hue: hue + self.rng.gen_range(-10.0..10.0),
                saturation: primary.s,
                lightness: primary.l + 8.0,
                alpha: 0.85,
                decay,
                generation,
                velocity,
                ..Default::default()
            };
            if self.spawn(at, &spec) {
                spawned += 1;
            }
        }
        info!(generation, spawned, "bloom");
    }

    // ---- completion ----

    pub(super) fn update_completion(&mut self, dt: f32) {
        for node in self.graph.nodes_mut() {
            node.pulse_phase = (node.pulse_phase + dt * 1.2) % TAU;
        }
        if !self.completion.active {
            return;
        }

        let effects = &self.config.effects;
        self.completion.orbit_angle = (self.completion.orbit_angle + effects.orbit_speed * dt) % TAU;

        if let Some(age) = self.completion.pulse_age.as_mut() {
            *age += dt;
            if *age > PULSE_LIFE {
                self.completion.pulse_age = None;
            }
        }
        self.completion.pulse_timer += dt;
        if self.completion.pulse_timer >= effects.pulse_interval {
            self.completion.pulse_timer = 0.0;
            self.completion.pulse_age = Some(0.0);
            let root = self.graph.root();
            if let Some(at) = self.node_position(root) {
                self.discovery.echo(at);
            }
        }

        self.completion.wind += effects.wind_rate * dt;
        while self.completion.wind >= 1.0 {
            self.completion.wind -= 1.0;
            self.emit_wind();
        }
    }

    /// One mote drifting from a random node toward one of its neighbors.
    fn emit_wind(&mut self) {
        let from = self.rng.gen_range(0..self.graph.len());
        let neighbors: Vec<NodeIndex> = self.graph.neighbors(from).collect();
        let Some(&to) = neighbors.choose(&mut self.rng) else {
            return;
        };
        let (Some(a), Some(b)) = (self.node_position(from), self.node_position(to)) else {
            return;
        };
        let dir = (b - a).normalize_or_zero();
        let secondary = self.circadian.profile().secondary;
        let spec = ParticleSpec {
            radius: 0.9,
            hue: secondary.h,
            saturation: secondary.s,
            lightness: secondary.l + 10.0,
            alpha: 0.5,
            decay: 0.25,
            velocity: dir * self.rng.gen_range(0.8..1.6),
            ..Default::default()
        };
        self.spawn(a, &spec);
    }

    pub(super) fn completion_pulse(&self) -> Option<f32> {
        self.completion.pulse_age.filter(|_| self.completion.active)
    }

    // ---- revisit and tour ----

    /// Replay a discovered node's effects: shockwave, melody, label.
    pub(super) fn replay(&mut self, node: NodeIndex) -> Option<DiscoveredPosition> {
        let info = self.describe(node)?;
        self.discovery.echo(Vec2::new(info.x, info.y));
        self.play_label(&info.label);
        self.start_text(&info.label);
        Some(info)
    }

    /// Start the guided tour. Only available once every node is discovered.
    pub fn start_tour(&mut self) -> bool {
        if self.destroyed || !self.discovery.is_complete() {
            return false;
        }
        self.tour_serial += 1;
        self.tour = Some(Tour {
            order: (0..self.graph.len()).collect(),
            step: 0,
            serial: self.tour_serial,
        });
        info!("tour started");
        self.visit_tour_stop();
        true
    }

    pub fn stop_tour(&mut self) {
        if self.tour.take().is_some() {
            info!("tour stopped");
        }
    }

    pub fn is_touring(&self) -> bool {
        self.tour.is_some()
    }

    pub(super) fn advance_tour(&mut self, serial: u64) {
        let Some(tour) = self.tour.as_mut().filter(|t| t.serial == serial) else {
            return;
        };
        tour.step += 1;
        if tour.step >= tour.order.len() {
            self.tour = None;
            info!("tour finished");
            return;
        }
        self.visit_tour_stop();
    }

    fn visit_tour_stop(&mut self) {
        let Some((node, serial)) = self
            .tour
            .as_ref()
            .and_then(|t| t.order.get(t.step).map(|&n| (n, t.serial)))
        else {
            return;
        };
        self.focus = Some(node);
        self.replay(node);
        self.defer(self.config.effects.tour_dwell, Deferred::TourStep(serial));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OrganismConfig;
    use crate::input::InputEvent;
    use crate::memory::MemoryGraph;
    use crate::organism::Organism;
    use glam::Vec2;

    fn organism(config: OrganismConfig) -> Organism {
        let mut org = Organism::with_seed(MemoryGraph::builtin().unwrap(), config, 800.0, 600.0, 11)
            .unwrap()
            .with_hour(12.0);
        org.start();
        org
    }

    fn pinned(org: &Organism) -> usize {
        org.particles().iter().filter(|p| p.pin.is_some()).count()
    }

    #[test]
    fn test_text_holds_then_releases() {
        let mut org = organism(OrganismConfig::default());
        org.discover("origin");
        let pinned_at_start = pinned(&org);
        assert!(pinned_at_start > 0);

        // hold 2.5 s + release 1.5 s
        for _ in 0..60 {
            org.update(0.05);
        }
        assert_eq!(org.forming_text(), Some("Coder"));
        let force = org
            .particles()
            .iter()
            .find_map(|p| p.pin)
            .map(|pin| pin.force)
            .unwrap();
        assert!(force < OrganismConfig::default().physics.text_force);

        for _ in 0..40 {
            org.update(0.05);
        }
        assert_eq!(org.forming_text(), None);
        assert_eq!(pinned(&org), 0);
    }

    #[test]
    fn test_new_label_replaces_formation() {
        let mut org = organism(OrganismConfig::default());
        org.discover("origin");
        org.discover("music");
        assert_eq!(org.forming_text(), Some("Musician"));
    }

    #[test]
    fn test_bloom_advances_generation() {
        let mut config = OrganismConfig::default();
        config.effects.bloom_threshold = 50.0;
        let mut org = organism(config);
        for i in 0..40 {
            let x = 100.0 + (i % 2) as f32 * 200.0;
            org.handle_input(InputEvent::PointerMove { pos: Vec2::new(x, 300.0) });
            org.update(0.05);
        }
        assert!(org.generation() > 0);
        assert_eq!(org.audio().generation(), org.generation());
        assert!(org.particles().iter().any(|p| p.generation > 0));
    }

    #[test]
    fn test_idle_motes_come_from_placed_nodes() {
        let mut config = OrganismConfig::default();
        config.effects.idle_threshold = 0.5;
        config.physics.initial_particles = 0;
        let mut org = organism(config);
        org.discover("origin");
        let before = org.particles().len();
        for _ in 0..40 {
            org.update(0.05);
        }
        assert!(org.particles().len() > before);
        assert!(org.particles().iter().any(|p| p.decay > 0.0));
    }

    #[test]
    fn test_idle_text_reforms_discovered_label() {
        let mut config = OrganismConfig::default();
        config.effects.idle_threshold = 0.5;
        config.effects.idle_text_threshold = 1.0;
        config.effects.text_hold = 0.1;
        config.effects.text_release = 0.1;
        let mut org = organism(config);
        org.discover("music");
        for _ in 0..10 {
            org.update(0.05);
        }
        assert_eq!(org.forming_text(), None);

        let mut reformed = false;
        for _ in 0..20 {
            org.update(0.05);
            reformed |= org.forming_text() == Some("Musician");
        }
        assert!(reformed);
    }

    #[test]
    fn test_tour_requires_completion() {
        let mut org = organism(OrganismConfig::default());
        assert!(!org.start_tour());
        let ids: Vec<String> = org.graph().nodes().iter().map(|n| n.id().to_string()).collect();
        for id in &ids {
            org.discover(id);
        }
        assert!(org.start_tour());
        assert!(org.is_touring());
        assert_eq!(org.focused(), Some(0));

        // 5 s dwell per stop
        for _ in 0..101 {
            org.update(0.05);
        }
        assert_eq!(org.focused(), Some(1));
        org.stop_tour();
        for _ in 0..200 {
            org.update(0.05);
        }
        assert_eq!(org.focused(), Some(1));
        assert!(!org.is_touring());
    }

    #[test]
    fn test_completion_spawns_wind() {
        let mut config = OrganismConfig::default();
        config.physics.initial_particles = 0;
        let mut org = organism(config);
        let ids: Vec<String> = org.graph().nodes().iter().map(|n| n.id().to_string()).collect();
        for id in &ids {
            org.discover(id);
        }
        let before = org.particles().len();
        for _ in 0..20 {
            org.update(0.05);
        }
        assert!(org.particles().len() > before);
    }
}
