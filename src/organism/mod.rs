//! The organism: one session of the living constellation.
//!
//! [`Organism`] owns one of everything (particle pool, spatial index, memory
//! graph, discovery session, audio engine, input unifier, circadian clock,
//! quality monitor) and runs them in a fixed order each tick:
//!
//! ```text
//! input -> physics -> discovery -> audio -> text formation / effects -> deferred
//! ```
//!
//! Hosts drive it with [`Organism::update`] and [`Organism::draw`], feed raw
//! events through [`Organism::handle_input`], and pull audio with
//! [`Organism::render_audio`].
//!
//! # Example
//!
//! ```ignore
//! use organism::prelude::*;
//!
//! let graph = MemoryGraph::builtin()?;
//! let mut organism = Organism::new(graph, OrganismConfig::default(), 1280.0, 720.0)?;
//! organism.on_discovery_change(|count| println!("{}/{}", count.discovered, count.total));
//! organism.start();
//!
//! // every frame
//! organism.handle_input(InputEvent::PointerMove { pos: Vec2::new(640.0, 360.0) });
//! organism.update(1.0 / 60.0);
//! organism.draw(&mut canvas);
//! ```

mod effects;
mod physics;
mod render;

pub use physics::project_on_segment;

use crate::audio::AudioEngine;
use crate::circadian::CircadianClock;
use crate::config::OrganismConfig;
use crate::discovery::{compute_anchors, DiscoveryEvent, DiscoverySystem};
use crate::draw::Canvas;
use crate::error::ConfigError;
use crate::input::{InputEvent, InputSnapshot, InputUnifier};
use crate::memory::{string_to_melody, MemoryGraph, NodeIndex, NodeKind};
use crate::particle::{ParticleSpec, ParticleStore};
use crate::quality::AdaptiveQuality;
use crate::spatial::SpatialIndex;
use crate::time::{cap_delta, Scheduler};
use crate::visuals::{lerp_hue, GlowSprite};
use effects::{Bloom, Completion, Deferred, IdleState, TextFormation, Tour};
use glam::Vec2;
use physics::{Forces, PhysicsScratch};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use tracing::{debug, info};

/// Seed used by [`Organism::new`].
pub const DEFAULT_SEED: u64 = 0x5eed_0f_11fe;

/// Pick radius for [`Organism::node_at`], in pixels.
const PICK_RADIUS: f32 = 28.0;

/// A discovered node and where its particle currently is.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPosition {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryCount {
    pub discovered: usize,
    pub total: usize,
}

/// Result of [`Organism::activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The focused node was undiscovered and is now discovered.
    Discovered,
    /// The focused node was already discovered and links out.
    OpenLink(String),
    /// Nothing focused, or nothing to open.
    None,
}

type Callback = Box<dyn FnMut()>;
type CountCallback = Box<dyn FnMut(DiscoveryCount)>;
type RevisitCallback = Box<dyn FnMut(&DiscoveredPosition)>;

/// Single-slot host callbacks. Setting one replaces the previous.
#[derive(Default)]
struct Callbacks {
    intro_complete: Option<Callback>,
    discovery_change: Option<CountCallback>,
    constellation_complete: Option<Callback>,
    revisit: Option<RevisitCallback>,
}

pub struct Organism {
    config: OrganismConfig,
    graph: MemoryGraph,
    particles: ParticleStore,
    index: SpatialIndex<usize>,
    scratch: PhysicsScratch,
    discovery: DiscoverySystem,
    audio: AudioEngine,
    input: InputUnifier,
    snapshot: InputSnapshot,
    circadian: CircadianClock,
    quality: AdaptiveQuality,
    sprite: GlowSprite,
    rng: SmallRng,
    deferred: Scheduler<Deferred>,
    callbacks: Callbacks,

    width: f32,
    height: f32,
    center: Vec2,
    /// Layout radius for anchors.
    radius: f32,
    /// Pinch zoom; scales only the physics spread.
    zoom: f32,

    clock: f32,
    breath_phase: f32,
    running: bool,
    started: bool,
    destroyed: bool,
    intro_done: bool,

    text: Option<TextFormation>,
    text_serial: u64,
    idle: IdleState,
    bloom: Bloom,
    completion: Completion,
    tour: Option<Tour>,
    tour_serial: u64,
    focus: Option<NodeIndex>,
    last_melody: Vec<i32>,
}

impl Organism {
    /// Build a session with the default seed.
    pub fn new(
        graph: MemoryGraph,
        config: OrganismConfig,
        width: f32,
        height: f32,
    ) -> Result<Self, ConfigError> {
        Self::with_seed(graph, config, width, height, DEFAULT_SEED)
    }

    /// Build a session whose randomness is fully determined by `seed`.
    ///
    /// Fails if `config` does not pass [`OrganismConfig::validate`].
    pub fn with_seed(
        graph: MemoryGraph,
        config: OrganismConfig,
        width: f32,
        height: f32,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let circadian = CircadianClock::new();
        let mut audio = AudioEngine::new(config.audio.clone(), seed ^ 0xa0d1_0000);
        audio.set_mood(circadian.profile().mood);
        audio.set_scale(circadian.profile().scale);
        audio.set_note_density(circadian.profile().note_density);

        let mut organism = Self {
            particles: ParticleStore::new(config.physics.capacity),
            index: SpatialIndex::new(config.spatial),
            scratch: PhysicsScratch::default(),
            discovery: DiscoverySystem::new(config.discovery.clone(), graph.len()),
            audio,
            input: InputUnifier::new(),
            snapshot: InputSnapshot::default(),
            circadian,
            quality: AdaptiveQuality::new(config.quality.clone()),
            sprite: GlowSprite::default(),
            rng: SmallRng::seed_from_u64(seed),
            deferred: Scheduler::new(),
            callbacks: Callbacks::default(),
            width,
            height,
            center: Vec2::new(width, height) * 0.5,
            radius: width.min(height) * config.physics.radius_fraction,
            zoom: 1.0,
            clock: 0.0,
            breath_phase: 0.0,
            running: false,
            started: false,
            destroyed: false,
            intro_done: false,
            text: None,
            text_serial: 0,
            idle: IdleState::default(),
            bloom: Bloom::default(),
            completion: Completion::default(),
            tour: None,
            tour_serial: 0,
            focus: None,
            last_melody: Vec::new(),
            graph,
            config,
        };
        organism.populate();
        Ok(organism)
    }

    /// Pin the circadian clock to a fixed hour instead of local time.
    pub fn with_hour(mut self, hour: f32) -> Self {
        self.circadian = CircadianClock::fixed(hour);
        self.apply_circadian();
        self
    }

    fn populate(&mut self) {
        let spread = self.radius * 1.4;
        let profile = *self.circadian.profile();
        let trail = profile.trail_samples();

        for _ in 0..self.config.physics.initial_particles {
            let pos = self.center + random_in_disc(&mut self.rng) * spread;
            let base = if self.rng.gen_bool(0.5) {
                profile.primary
            } else {
                profile.secondary
            };
            let spec = ParticleSpec {
                radius: self.rng.gen_range(1.2..2.4),
                hue: base.h + self.rng.gen_range(-12.0..12.0),
                saturation: base.s,
                lightness: base.l,
                alpha: self.rng.gen_range(0.5..0.9),
                trail_length: trail,
                ..Default::default()
            };
            self.particles.add(pos, &spec);
        }

        for node in 0..self.graph.len() {
            let pos = self.center + random_in_disc(&mut self.rng) * self.radius * 0.85;
            let spec = ParticleSpec {
                hue: profile.accent.h,
                ..ParticleSpec::memory(node)
            };
            let handle = self.particles.add(pos, &spec);
            if let Some(memory) = self.graph.node_mut(node) {
                memory.particle = handle;
            }
        }
    }

    // ---- lifecycle ----

    /// Start (or resume) ticking. The intro runs on the first start.
    pub fn start(&mut self) {
        if self.destroyed || self.running {
            return;
        }
        self.running = true;
        if !self.started {
            self.started = true;
            self.defer(self.config.effects.intro_duration, Deferred::IntroComplete);
        }
        info!(particles = self.particles.len(), "organism started");
    }

    /// Pause ticking. State is kept.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("organism stopped");
        }
    }

    /// Tear down: halt, detach input, stop audio, drop pending work.
    /// The session cannot be restarted.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.running = false;
        self.input.detach();
        self.audio.destroy();
        self.deferred.clear();
        self.tour = None;
        self.text = None;
        self.destroyed = true;
        info!("organism destroyed");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn intro_complete(&self) -> bool {
        self.intro_done
    }

    // ---- frame loop ----

    /// Forward a raw input event.
    pub fn handle_input(&mut self, event: InputEvent) {
        self.input.handle_event(event);
    }

    /// Forward a winit window event.
    #[cfg(feature = "viewer")]
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) {
        self.input.handle_window_event(event);
    }

    /// Advance the session by `dt` seconds (capped at 50 ms).
    pub fn update(&mut self, dt: f32) {
        if !self.running || self.destroyed {
            return;
        }
        if self.quality.record(dt * 1000.0) {
            let cap = self.quality.capacity(self.config.physics.capacity);
            let evicted = self.particles.set_capacity(cap);
            info!(capacity = cap, evicted, "quality reduced");
        }
        let dt = cap_delta(dt);
        self.clock += dt;

        if self.circadian.update(dt) {
            self.apply_circadian();
        }

        // Input snapshot is read once per tick
        self.snapshot = self.input.update(dt).clone();
        if self.snapshot.pinch != 1.0 {
            self.zoom = (self.zoom * self.snapshot.pinch).clamp(0.5, 2.5);
        }
        if let Some(pos) = self.snapshot.click {
            self.click(pos);
        }
        self.accumulate_bloom(dt);

        self.step_physics(dt);

        let positions = self.node_positions();
        let pointer = self
            .snapshot
            .position
            .map(|_| (self.snapshot.smoothed, self.snapshot.modality));
        let events = self
            .discovery
            .update(dt, &mut self.graph, &positions, pointer);
        self.handle_discovery_events(events);

        self.audio.update(dt);

        self.update_text();
        self.update_idle(dt);
        self.update_completion(dt);

        for action in self.deferred.drain_due(self.clock) {
            self.run_deferred(action);
        }
    }

    fn step_physics(&mut self, dt: f32) {
        let profile = *self.circadian.profile();
        let idle = self.is_idle();

        self.breath_phase = (self.breath_phase + dt * profile.breathing_rate * TAU) % TAU;
        let breath_amp = self.config.physics.breathing * if idle { 2.0 } else { 1.0 };
        let intro_boost = if self.intro_done { 1.0 } else { 4.0 };
        let cohesion = self.config.physics.cohesion * profile.speed * intro_boost / self.zoom;

        let anchors = self.settled_anchors();
        let forces = Forces {
            config: &self.config.physics,
            center: self.center,
            cohesion,
            breath: self.breath_phase.sin() * breath_amp * self.zoom,
            input: &self.snapshot,
            shockwaves: self.discovery.shockwaves(),
            anchors: &anchors,
            swipe: self.snapshot.swipe,
            clock: self.clock,
        };
        physics::step(
            &mut self.particles,
            &mut self.index,
            &mut self.scratch,
            &forces,
            dt,
        );

        // Evicted memory particles lose their back-reference
        for node in self.graph.nodes_mut() {
            if let Some(handle) = node.particle {
                if !self.particles.contains(handle) {
                    node.particle = None;
                }
            }
        }
    }

    /// Anchor per node for discovered nodes, with the completion orbit applied.
    fn settled_anchors(&self) -> Vec<Option<Vec2>> {
        let orbit = self.completion.orbit_angle;
        self.graph
            .nodes()
            .iter()
            .map(|node| {
                let anchor = node.anchor.filter(|_| node.is_discovered())?;
                if node.kind() == NodeKind::Work && orbit != 0.0 {
                    Some(self.center + Vec2::from_angle(orbit).rotate(anchor - self.center))
                } else {
                    Some(anchor)
                }
            })
            .collect()
    }

    fn node_positions(&self) -> Vec<Option<Vec2>> {
        self.graph
            .nodes()
            .iter()
            .map(|n| n.particle.and_then(|h| self.particles.get(h)).map(|p| p.pos))
            .collect()
    }

    fn node_position(&self, node: NodeIndex) -> Option<Vec2> {
        let memory = self.graph.node(node)?;
        memory
            .particle
            .and_then(|h| self.particles.get(h))
            .map(|p| p.pos)
            .or(memory.anchor)
    }

    fn apply_circadian(&mut self) {
        let profile = *self.circadian.profile();
        self.audio.set_mood(profile.mood);
        self.audio.set_scale(profile.scale);
        self.audio.set_note_density(profile.note_density);

        let trail = profile.trail_samples();
        for p in self.particles.iter_mut() {
            p.set_trail_capacity(trail);
            if p.is_memory() {
                p.hue = profile.accent.h;
                continue;
            }
            let base = if p.handle().id() % 2 == 0 {
                profile.primary
            } else {
                profile.secondary
            };
            let offset = (p.phase / TAU - 0.5) * 24.0;
            p.hue = lerp_hue(p.hue, base.h + offset, 1.0);
            p.saturation = base.s;
            p.lightness = base.l;
        }
        debug!(phase = ?profile.phase, blend = profile.blend, "circadian refresh");
    }

    fn handle_discovery_events(&mut self, events: Vec<DiscoveryEvent>) {
        for event in events {
            match event {
                DiscoveryEvent::Discovered { node, .. } => {
                    let label = self
                        .graph
                        .node(node)
                        .map(|n| n.label().to_string())
                        .unwrap_or_default();

                    self.play_label(&label);
                    self.start_text(&label);
                    compute_anchors(&mut self.graph, self.center, self.radius);
                    self.light_memory_particle(node);

                    let count = self.discovery_count();
                    if let Some(cb) = self.callbacks.discovery_change.as_mut() {
                        cb(count);
                    }
                }
                DiscoveryEvent::Completed => {
                    self.completion.begin();
                    if let Some(cb) = self.callbacks.constellation_complete.as_mut() {
                        cb();
                    }
                }
            }
        }
    }

    fn light_memory_particle(&mut self, node: NodeIndex) {
        let accent = self.circadian.profile().accent;
        let handle = self.graph.node(node).and_then(|n| n.particle);
        if let Some(p) = handle.and_then(|h| self.particles.get_mut(h)) {
            p.radius = 4.5;
            p.alpha = 1.0;
            p.hue = accent.h;
            p.lightness = accent.l;
        }
    }

    fn play_label(&mut self, label: &str) {
        let melody = string_to_melody(label);
        self.audio.play_melody(&melody);
        self.last_melody = melody;
    }

    /// Queue `action` to run `delay` seconds from now. Dropped once destroyed.
    fn defer(&mut self, delay: f32, action: Deferred) {
        if !self.destroyed {
            self.deferred.schedule(self.clock + delay, action);
        }
    }

    fn run_deferred(&mut self, action: Deferred) {
        match action {
            Deferred::IntroComplete => {
                if !self.intro_done {
                    self.intro_done = true;
                    info!("intro complete");
                    if let Some(cb) = self.callbacks.intro_complete.as_mut() {
                        cb();
                    }
                }
            }
            Deferred::ReleaseText(serial) => self.begin_text_release(serial),
            Deferred::TourStep(serial) => self.advance_tour(serial),
        }
    }

    // ---- drawing ----

    /// Draw the current frame.
    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        render::draw(self, canvas);
    }

    /// Viewport resized. Recomputes the center and layout radius, and
    /// re-lays anchors if anything has been discovered. Discovery state and
    /// particle identity are kept.
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.destroyed {
            return;
        }
        self.width = width;
        self.height = height;
        self.center = Vec2::new(width, height) * 0.5;
        self.radius = width.min(height) * self.config.physics.radius_fraction;
        if self.graph.discovered_count() > 0 {
            compute_anchors(&mut self.graph, self.center, self.radius);
        }
        debug!(width, height, "resized");
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Current pinch zoom. Affects physics spread only, not anchors.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    // ---- audio ----

    /// Turn audio on. Returns `false` after `destroy`.
    pub fn enable_audio(&mut self) -> bool {
        !self.destroyed && self.audio.enable()
    }

    pub fn toggle_audio(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.audio.toggle()
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.audio.is_enabled()
    }

    /// Pull mono samples for the audio sink.
    pub fn render_audio(&mut self, out: &mut [f32]) {
        self.audio.render(out);
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    // ---- queries ----

    pub fn graph(&self) -> &MemoryGraph {
        &self.graph
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    pub fn discovery(&self) -> &DiscoverySystem {
        &self.discovery
    }

    pub fn quality(&self) -> &AdaptiveQuality {
        &self.quality
    }

    pub fn circadian(&self) -> &CircadianClock {
        &self.circadian
    }

    pub fn config(&self) -> &OrganismConfig {
        &self.config
    }

    /// Session clock in seconds.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Degrees of the last melody played for a label.
    pub fn last_melody(&self) -> &[i32] {
        &self.last_melody
    }

    /// Label currently formed by particles, if any.
    pub fn forming_text(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.label.as_str())
    }

    pub fn generation(&self) -> u32 {
        self.bloom.generation
    }

    /// Deferred actions still queued.
    pub fn pending_actions(&self) -> usize {
        self.deferred.len()
    }

    /// Position of a node's particle (or its anchor when it has none).
    pub fn position_of(&self, id: &str) -> Option<Vec2> {
        self.node_position(self.graph.index_of(id)?)
    }

    /// Every discovered node with its current position.
    pub fn discovered_positions(&self) -> Vec<DiscoveredPosition> {
        self.discovery
            .discovered()
            .iter()
            .filter_map(|&node| self.describe(node))
            .collect()
    }

    fn describe(&self, node: NodeIndex) -> Option<DiscoveredPosition> {
        let memory = self.graph.node(node)?;
        let pos = self.node_position(node)?;
        Some(DiscoveredPosition {
            id: memory.record.id.clone(),
            label: memory.record.label.clone(),
            description: memory.record.description.clone(),
            url: memory.record.url.clone(),
            kind: memory.kind(),
            x: pos.x,
            y: pos.y,
        })
    }

    pub fn discovery_count(&self) -> DiscoveryCount {
        DiscoveryCount {
            discovered: self.graph.discovered_count(),
            total: self.graph.len(),
        }
    }

    // ---- callbacks ----

    pub fn on_intro_complete(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.intro_complete = Some(Box::new(f));
    }

    pub fn on_discovery_change(&mut self, f: impl FnMut(DiscoveryCount) + 'static) {
        self.callbacks.discovery_change = Some(Box::new(f));
    }

    pub fn on_constellation_complete(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.constellation_complete = Some(Box::new(f));
    }

    pub fn on_revisit(&mut self, f: impl FnMut(&DiscoveredPosition) + 'static) {
        self.callbacks.revisit = Some(Box::new(f));
    }

    // ---- host-driven interaction ----

    /// Discover a node by id. Returns `false` if unknown or already discovered.
    pub fn discover(&mut self, id: &str) -> bool {
        if self.destroyed {
            return false;
        }
        let Some(node) = self.graph.index_of(id) else {
            return false;
        };
        self.discover_index(node)
    }

    fn discover_index(&mut self, node: NodeIndex) -> bool {
        if self.destroyed {
            return false;
        }
        let positions = self.node_positions();
        let events = self.discovery.discover(node, &mut self.graph, &positions);
        let discovered = !events.is_empty();
        self.handle_discovery_events(events);
        discovered
    }

    /// Node whose particle is nearest `pos`, within the pick radius.
    pub fn node_at(&self, pos: Vec2) -> Option<NodeIndex> {
        self.node_positions()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p.distance(pos))))
            .filter(|&(_, d)| d <= PICK_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Click or tap. Revisits the discovered node under `pos`, if any.
    pub fn click(&mut self, pos: Vec2) -> Option<DiscoveredPosition> {
        if self.destroyed {
            return None;
        }
        let node = self.node_at(pos)?;
        if !self.discovery.is_discovered(node) {
            return None;
        }
        self.revisit(node)
    }

    fn revisit(&mut self, node: NodeIndex) -> Option<DiscoveredPosition> {
        if self.destroyed {
            return None;
        }
        let info = self.replay(node)?;
        if let Some(cb) = self.callbacks.revisit.as_mut() {
            cb(&info);
        }
        debug!(node = %info.id, "revisit");
        Some(info)
    }

    pub fn focused(&self) -> Option<NodeIndex> {
        self.focus
    }

    /// Move keyboard focus to the next node in table order.
    pub fn focus_next(&mut self) -> Option<NodeIndex> {
        let n = self.graph.len();
        if self.destroyed || n == 0 {
            return None;
        }
        self.focus = Some(match self.focus {
            Some(i) => (i + 1) % n,
            None => 0,
        });
        self.focus
    }

    /// Move keyboard focus to the previous node in table order.
    pub fn focus_previous(&mut self) -> Option<NodeIndex> {
        let n = self.graph.len();
        if self.destroyed || n == 0 {
            return None;
        }
        self.focus = Some(match self.focus {
            Some(i) => (i + n - 1) % n,
            None => n - 1,
        });
        self.focus
    }

    /// Act on the focused node: discover it, or open its link if it is
    /// already discovered. A discovered node without a link is revisited.
    pub fn activate(&mut self) -> Activation {
        let Some(node) = self.focus.filter(|_| !self.destroyed) else {
            return Activation::None;
        };
        if !self.discovery.is_discovered(node) {
            return if self.discover_index(node) {
                Activation::Discovered
            } else {
                Activation::None
            };
        }
        match self.graph.node(node).and_then(|n| n.record.url.clone()) {
            Some(url) => Activation::OpenLink(url),
            None => {
                self.revisit(node);
                Activation::None
            }
        }
    }
}

/// Uniform random point in the unit disc.
fn random_in_disc<R: Rng>(rng: &mut R) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    let r = rng.gen::<f32>().sqrt();
    Vec2::from_angle(angle) * r
}
