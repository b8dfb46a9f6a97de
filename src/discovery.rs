//! Dwell tracking and the discovery session.
//!
//! Each node moves `Hidden -> Warming -> Dwelling -> Discovered`. Warming is a
//! coarse proximity state used only for pre-discovery glow; dwelling
//! accumulates time while the pointer stays within a tighter radius, and
//! crossing the dwell threshold discovers the node. Discovery is terminal.
//!
//! The system also owns the time-bounded effects a discovery spawns
//! (shockwaves, connection trails) and the persistent flow streams between
//! discovered neighbors, and lays out the constellation anchors.

use crate::input::Modality;
use crate::memory::{MemoryGraph, NodeIndex, NodeKind};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};
use tracing::info;

/// Golden angle in radians.
pub const GOLDEN_ANGLE: f32 = 2.399_963;

/// Dwell and effect tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Radius of the pre-discovery glow.
    pub warm_radius: f32,
    pub pointer_radius: f32,
    /// Seconds a pointer must dwell.
    pub pointer_dwell: f32,
    pub touch_radius: f32,
    /// Seconds a touch must dwell.
    pub touch_dwell: f32,
    pub shockwave_life: f32,
    /// Wavefront speed in pixels per second.
    pub shockwave_speed: f32,
    pub trail_life: f32,
    /// Seconds without a discovery per hint level.
    pub hint_interval: f32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            warm_radius: 140.0,
            pointer_radius: 40.0,
            pointer_dwell: 1.5,
            touch_radius: 70.0,
            touch_dwell: 1.0,
            shockwave_life: 1.6,
            shockwave_speed: 260.0,
            trail_life: 3.0,
            hint_interval: 20.0,
        }
    }
}

impl DiscoveryConfig {
    /// `(radius, seconds)` needed to discover with `modality`.
    pub fn dwell_for(&self, modality: Modality) -> (f32, f32) {
        match modality {
            Modality::Pointer => (self.pointer_radius, self.pointer_dwell),
            Modality::Touch => (self.touch_radius, self.touch_dwell),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Hidden,
    Warming,
    Dwelling,
    Discovered,
}

/// Expanding ring emitted on discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shockwave {
    pub origin: Vec2,
    pub age: f32,
    pub max_age: f32,
    pub speed: f32,
}

impl Shockwave {
    pub fn radius(&self) -> f32 {
        self.age * self.speed
    }

    /// Strength in `0.0..=1.0`, fading linearly with age.
    pub fn amplitude(&self) -> f32 {
        (1.0 - self.age / self.max_age).clamp(0.0, 1.0)
    }

    fn is_expired(&self) -> bool {
        self.age >= self.max_age
    }
}

/// Fading line drawn once between newly connected nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionTrail {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub age: f32,
    pub max_age: f32,
}

impl ConnectionTrail {
    pub fn alpha(&self) -> f32 {
        (1.0 - self.age / self.max_age).clamp(0.0, 1.0)
    }
}

/// Persistent stream of motes running along a curve between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowStream {
    pub from: NodeIndex,
    pub to: NodeIndex,
    /// Progress of the lead mote along the curve, `0.0..1.0`.
    pub phase: f32,
    /// Signed sideways bend of the curve as a fraction of its length.
    pub bend: f32,
}

impl FlowStream {
    /// Loops per second.
    const SPEED: f32 = 0.25;

    /// Control point of the quadratic curve between `a` and `b`.
    pub fn control_point(&self, a: Vec2, b: Vec2) -> Vec2 {
        let mid = (a + b) * 0.5;
        let d = b - a;
        mid + d.perp() * self.bend
    }
}

/// Point on the quadratic Bezier `a -> b` with control `c` at `t`.
pub fn quadratic_point(a: Vec2, c: Vec2, b: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    a * (u * u) + c * (2.0 * u * t) + b * (t * t)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    /// A node was discovered at `at`. `neighbors` are its already-discovered
    /// neighbors.
    Discovered {
        node: NodeIndex,
        at: Vec2,
        neighbors: Vec<NodeIndex>,
    },
    /// The last undiscovered node was just discovered.
    Completed,
}

/// Per-session discovery state.
#[derive(Debug, Clone)]
pub struct DiscoverySystem {
    config: DiscoveryConfig,
    states: Vec<NodeState>,
    warmth: Vec<f32>,
    /// Discovery order.
    discovered: Vec<NodeIndex>,
    active: Option<NodeIndex>,
    previous: Option<NodeIndex>,
    dwell: f32,
    dwell_target: f32,
    shockwaves: Vec<Shockwave>,
    trails: Vec<ConnectionTrail>,
    flows: Vec<FlowStream>,
    since_last: f32,
    complete: bool,
}

impl DiscoverySystem {
    pub fn new(config: DiscoveryConfig, node_count: usize) -> Self {
        let dwell_target = config.pointer_dwell;
        Self {
            config,
            states: vec![NodeState::Hidden; node_count],
            warmth: vec![0.0; node_count],
            discovered: Vec::new(),
            active: None,
            previous: None,
            dwell: 0.0,
            dwell_target,
            shockwaves: Vec::new(),
            trails: Vec::new(),
            flows: Vec::new(),
            since_last: 0.0,
            complete: false,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn state(&self, node: NodeIndex) -> NodeState {
        self.states.get(node).copied().unwrap_or_default()
    }

    pub fn states(&self) -> &[NodeState] {
        &self.states
    }

    /// Pre-discovery glow in `0.0..=1.0`, strongest when the pointer is on
    /// top of the node.
    pub fn warmth(&self, node: NodeIndex) -> f32 {
        self.warmth.get(node).copied().unwrap_or(0.0)
    }

    /// Discovered nodes in discovery order.
    pub fn discovered(&self) -> &[NodeIndex] {
        &self.discovered
    }

    pub fn is_discovered(&self, node: NodeIndex) -> bool {
        self.state(node) == NodeState::Discovered
    }

    /// Node currently being dwelt on.
    pub fn active(&self) -> Option<NodeIndex> {
        self.active
    }

    pub fn previous(&self) -> Option<NodeIndex> {
        self.previous
    }

    /// Progress of the current dwell in `0.0..=1.0`.
    pub fn dwell_progress(&self) -> f32 {
        if self.active.is_none() || self.dwell_target <= 0.0 {
            return 0.0;
        }
        (self.dwell / self.dwell_target).clamp(0.0, 1.0)
    }

    pub fn shockwaves(&self) -> &[Shockwave] {
        &self.shockwaves
    }

    pub fn trails(&self) -> &[ConnectionTrail] {
        &self.trails
    }

    pub fn flows(&self) -> &[FlowStream] {
        &self.flows
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Seconds since the last discovery (or since the session began).
    pub fn since_last_discovery(&self) -> f32 {
        self.since_last
    }

    /// Hint strength 0..=3, rising every `hint_interval` without a discovery.
    pub fn hint_level(&self) -> u8 {
        if self.complete || self.config.hint_interval <= 0.0 {
            return 0;
        }
        (self.since_last / self.config.hint_interval).floor().min(3.0) as u8
    }

    /// Advance effects and dwell tracking by one tick.
    ///
    /// `positions[i]` is the current position of node `i`'s particle, if it
    /// has one. `pointer` is the smoothed pointer and its modality.
    pub fn update(
        &mut self,
        dt: f32,
        graph: &mut MemoryGraph,
        positions: &[Option<Vec2>],
        pointer: Option<(Vec2, Modality)>,
    ) -> Vec<DiscoveryEvent> {
        self.age_effects(dt);
        self.since_last += dt;

        let Some((at, modality)) = pointer else {
            self.reset_proximity();
            return Vec::new();
        };
        let (radius, threshold) = self.config.dwell_for(modality);

        let mut candidate: Option<(NodeIndex, f32)> = None;
        for (i, pos) in positions.iter().enumerate().take(self.states.len()) {
            if self.states[i] == NodeState::Discovered {
                continue;
            }
            let Some(pos) = pos else {
                self.states[i] = NodeState::Hidden;
                self.warmth[i] = 0.0;
                continue;
            };
            let d = pos.distance(at);
            self.warmth[i] = (1.0 - d / self.config.warm_radius).clamp(0.0, 1.0);
            self.states[i] = if d <= self.config.warm_radius {
                NodeState::Warming
            } else {
                NodeState::Hidden
            };
            if d <= radius && candidate.map_or(true, |(_, best)| d < best) {
                candidate = Some((i, d));
            }
        }

        let candidate = candidate.map(|(i, _)| i);
        if candidate == self.active && candidate.is_some() {
            self.dwell += dt;
        } else {
            if self.active.is_some() {
                self.previous = self.active;
            }
            self.active = candidate;
            self.dwell = if candidate.is_some() { dt } else { 0.0 };
        }
        self.dwell_target = threshold;

        let Some(node) = self.active else {
            return Vec::new();
        };
        self.states[node] = NodeState::Dwelling;
        if self.dwell >= self.dwell_target {
            return self.discover(node, graph, positions);
        }
        Vec::new()
    }

    /// Discover `node` now. Does nothing (and returns no events) if it is
    /// already discovered or out of range.
    pub fn discover(
        &mut self,
        node: NodeIndex,
        graph: &mut MemoryGraph,
        positions: &[Option<Vec2>],
    ) -> Vec<DiscoveryEvent> {
        let Some(memory) = graph.node_mut(node) else {
            return Vec::new();
        };
        if !memory.mark_discovered() {
            return Vec::new();
        }
        let at = positions
            .get(node)
            .copied()
            .flatten()
            .or(memory.anchor)
            .unwrap_or(Vec2::ZERO);
        let label = memory.label().to_string();

        if let Some(state) = self.states.get_mut(node) {
            *state = NodeState::Discovered;
        }
        if let Some(w) = self.warmth.get_mut(node) {
            *w = 0.0;
        }
        self.discovered.push(node);
        if self.active == Some(node) {
            self.previous = Some(node);
            self.active = None;
            self.dwell = 0.0;
        }
        self.since_last = 0.0;

        self.shockwaves.push(Shockwave {
            origin: at,
            age: 0.0,
            max_age: self.config.shockwave_life,
            speed: self.config.shockwave_speed,
        });

        let neighbors: Vec<NodeIndex> = graph
            .neighbors(node)
            .filter(|&n| self.is_discovered(n))
            .collect();
        for &other in &neighbors {
            self.trails.push(ConnectionTrail {
                from: other,
                to: node,
                age: 0.0,
                max_age: self.config.trail_life,
            });
            let bend = if (node + other) % 2 == 0 { 0.18 } else { -0.18 };
            self.flows.push(FlowStream {
                from: other,
                to: node,
                phase: 0.0,
                bend,
            });
        }

        info!(
            node = %label,
            discovered = self.discovered.len(),
            total = graph.len(),
            "memory discovered"
        );

        let mut events = vec![DiscoveryEvent::Discovered {
            node,
            at,
            neighbors,
        }];
        if !self.complete && graph.is_complete() {
            self.complete = true;
            info!("constellation complete");
            events.push(DiscoveryEvent::Completed);
        }
        events
    }

    /// Replay the shockwave for an already discovered node (tour, revisit).
    pub fn echo(&mut self, at: Vec2) {
        self.shockwaves.push(Shockwave {
            origin: at,
            age: 0.0,
            max_age: self.config.shockwave_life,
            speed: self.config.shockwave_speed,
        });
    }

    fn age_effects(&mut self, dt: f32) {
        for wave in &mut self.shockwaves {
            wave.age += dt;
        }
        self.shockwaves.retain(|w| !w.is_expired());

        for trail in &mut self.trails {
            trail.age += dt;
        }
        self.trails.retain(|t| t.age < t.max_age);

        for flow in &mut self.flows {
            flow.phase = (flow.phase + FlowStream::SPEED * dt).fract();
        }
    }

    fn reset_proximity(&mut self) {
        for (state, warmth) in self.states.iter_mut().zip(&mut self.warmth) {
            if *state != NodeState::Discovered {
                *state = NodeState::Hidden;
                *warmth = 0.0;
            }
        }
        if self.active.is_some() {
            self.previous = self.active.take();
        }
        self.dwell = 0.0;
    }
}

/// Lay out anchors for every discovered node.
///
/// The root sits at `center`. Discovered work nodes follow a golden-angle
/// spiral ordered by year, most recent innermost. Identity nodes take fixed
/// cardinal angles near the edge, in table order.
pub fn compute_anchors(graph: &mut MemoryGraph, center: Vec2, radius: f32) {
    let mut works: Vec<(NodeIndex, i32)> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.kind() == NodeKind::Work && n.is_discovered())
        .map(|(i, n)| (i, n.record.year.unwrap_or(i32::MIN)))
        .collect();
    works.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let count = works.len().max(1) as f32;

    let mut anchors: Vec<(NodeIndex, Vec2)> = Vec::with_capacity(graph.len());
    for (k, &(node, _)) in works.iter().enumerate() {
        let r = radius * (0.3 + 0.45 * ((k as f32 + 0.5) / count).sqrt());
        let angle = k as f32 * GOLDEN_ANGLE - FRAC_PI_2;
        anchors.push((node, center + Vec2::from_angle(angle) * r));
    }

    let identities = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.kind() == NodeKind::Identity);
    for (slot, (node, memory)) in identities.enumerate() {
        if !memory.is_discovered() {
            continue;
        }
        // Four cardinal points, then the diagonals for any extra facets
        let ring = slot / 4;
        let angle = (slot % 4) as f32 * TAU / 4.0 - FRAC_PI_2 + ring as f32 * TAU / 8.0;
        anchors.push((node, center + Vec2::from_angle(angle) * radius * 0.92));
    }

    let root = graph.root();
    if graph.node(root).is_some_and(|n| n.is_discovered()) {
        anchors.push((root, center));
    }

    for (node, anchor) in anchors {
        if let Some(memory) = graph.node_mut(node) {
            memory.anchor = Some(anchor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MemoryGraph, DiscoverySystem, Vec<Option<Vec2>>) {
        let graph = MemoryGraph::builtin().unwrap();
        let system = DiscoverySystem::new(DiscoveryConfig::default(), graph.len());
        let positions = (0..graph.len())
            .map(|i| Some(Vec2::new(100.0 + i as f32 * 200.0, 100.0)))
            .collect();
        (graph, system, positions)
    }

    #[test]
    fn test_dwell_threshold_boundary() {
        let (mut graph, mut system, positions) = setup();
        let target = positions[0].unwrap();
        let pointer = Some((target, Modality::Pointer));
        let dt = 0.1;
        let ticks = (system.config().pointer_dwell / dt).round() as usize;

        let mut events = Vec::new();
        for _ in 0..ticks - 1 {
            events.extend(system.update(dt, &mut graph, &positions, pointer));
        }
        assert!(events.is_empty());
        assert_eq!(system.state(0), NodeState::Dwelling);
        assert!(!graph.node(0).unwrap().is_discovered());

        for _ in 0..2 {
            events.extend(system.update(dt, &mut graph, &positions, pointer));
        }
        let discovered = events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::Discovered { node: 0, .. }))
            .count();
        assert_eq!(discovered, 1);
        assert_eq!(system.state(0), NodeState::Discovered);
        assert_eq!(system.shockwaves().len(), 1);
    }

    #[test]
    fn test_touch_dwells_faster() {
        let (mut graph, mut system, positions) = setup();
        let near = positions[0].unwrap() + Vec2::new(60.0, 0.0);
        let mut found = false;
        for _ in 0..11 {
            let events = system.update(0.1, &mut graph, &positions, Some((near, Modality::Touch)));
            found |= !events.is_empty();
        }
        assert!(found);
    }

    #[test]
    fn test_moving_away_resets_dwell() {
        let (mut graph, mut system, positions) = setup();
        let on = Some((positions[0].unwrap(), Modality::Pointer));
        let off = Some((Vec2::new(-500.0, -500.0), Modality::Pointer));
        for _ in 0..10 {
            system.update(0.1, &mut graph, &positions, on);
        }
        system.update(0.1, &mut graph, &positions, off);
        assert_eq!(system.dwell_progress(), 0.0);
        assert_eq!(system.previous(), Some(0));
        for _ in 0..10 {
            system.update(0.1, &mut graph, &positions, on);
        }
        assert!(!system.is_discovered(0));
    }

    #[test]
    fn test_warming_radius() {
        let (mut graph, mut system, positions) = setup();
        let near = positions[1].unwrap() + Vec2::new(0.0, 100.0);
        system.update(0.1, &mut graph, &positions, Some((near, Modality::Pointer)));
        assert_eq!(system.state(1), NodeState::Warming);
        assert!(system.warmth(1) > 0.0);
        assert_eq!(system.state(4), NodeState::Hidden);
    }

    #[test]
    fn test_discover_is_idempotent() {
        let (mut graph, mut system, positions) = setup();
        assert!(!system.discover(0, &mut graph, &positions).is_empty());
        assert!(system.discover(0, &mut graph, &positions).is_empty());
        assert_eq!(system.discovered(), &[0]);
        assert_eq!(system.shockwaves().len(), 1);
    }

    #[test]
    fn test_neighbors_get_trails_and_flows() {
        let (mut graph, mut system, positions) = setup();
        let root = graph.root();
        let work = graph.neighbors(root).next().unwrap();
        system.discover(root, &mut graph, &positions);
        let events = system.discover(work, &mut graph, &positions);
        assert_eq!(
            events[0],
            DiscoveryEvent::Discovered {
                node: work,
                at: positions[work].unwrap(),
                neighbors: vec![root],
            }
        );
        assert_eq!(system.trails().len(), 1);
        assert_eq!(system.flows().len(), 1);

        for _ in 0..40 {
            system.update(0.1, &mut graph, &positions, None);
        }
        assert!(system.trails().is_empty());
        assert!(system.shockwaves().is_empty());
        assert_eq!(system.flows().len(), 1);
    }

    #[test]
    fn test_completion_fires_once() {
        let (mut graph, mut system, positions) = setup();
        let mut completions = 0;
        for node in 0..graph.len() {
            for _ in 0..2 {
                completions += system
                    .discover(node, &mut graph, &positions)
                    .iter()
                    .filter(|e| **e == DiscoveryEvent::Completed)
                    .count();
            }
        }
        assert_eq!(completions, 1);
        assert!(system.is_complete());
        assert_eq!(system.hint_level(), 0);
    }

    #[test]
    fn test_hint_level_rises() {
        let (mut graph, mut system, positions) = setup();
        assert_eq!(system.hint_level(), 0);
        for _ in 0..450 {
            system.update(0.1, &mut graph, &positions, None);
        }
        assert_eq!(system.hint_level(), 2);
        for _ in 0..1000 {
            system.update(0.1, &mut graph, &positions, None);
        }
        assert_eq!(system.hint_level(), 3);
    }

    #[test]
    fn test_anchor_layout() {
        let (mut graph, mut system, positions) = setup();
        let center = Vec2::new(400.0, 300.0);
        for node in 0..graph.len() {
            system.discover(node, &mut graph, &positions);
        }
        compute_anchors(&mut graph, center, 250.0);

        assert_eq!(graph.node(graph.root()).unwrap().anchor, Some(center));

        // Most recent work is innermost
        let mut works: Vec<(i32, f32)> = graph
            .nodes()
            .iter()
            .filter(|n| n.kind() == NodeKind::Work)
            .map(|n| (n.record.year.unwrap(), n.anchor.unwrap().distance(center)))
            .collect();
        works.sort_by_key(|w| std::cmp::Reverse(w.0));
        assert!(works.windows(2).all(|w| w[0].1 < w[1].1));

        for node in graph.nodes().iter().filter(|n| n.kind() == NodeKind::Identity) {
            let d = node.anchor.unwrap().distance(center);
            assert!((d - 230.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_undiscovered_nodes_have_no_anchor() {
        let (mut graph, _, _) = setup();
        compute_anchors(&mut graph, Vec2::ZERO, 100.0);
        assert!(graph.nodes().iter().all(|n| n.anchor.is_none()));
    }
}
