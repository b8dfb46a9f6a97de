//! Fixed-capacity particle pool with Verlet particles.
//!
//! Particles carry position and previous position; velocity is implicit
//! (`pos - prev`). The pool hands out stable [`ParticleHandle`]s backed by a
//! monotonically increasing id, so removal by swap-with-last never
//! invalidates a handle held elsewhere (memory nodes keep one).
//!
//! # Spawning
//!
//! ```ignore
//! let mut store = ParticleStore::new(500);
//! let spec = ParticleSpec {
//!     hue: 190.0,
//!     decay: 0.1,
//!     ..Default::default()
//! };
//! if let Some(handle) = store.add(Vec2::new(400.0, 300.0), &spec) {
//!     store.get_mut(handle).unwrap().apply_impulse(Vec2::X);
//! }
//! ```

use crate::memory::NodeIndex;
use glam::Vec2;
use std::collections::{HashMap, VecDeque};

/// Default pool capacity.
pub const DEFAULT_CAPACITY: usize = 500;

/// Stable reference to a particle in a [`ParticleStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(u64);

impl ParticleHandle {
    /// Raw id. Ids are unique for the lifetime of the store.
    #[inline]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Formation target a particle is pulled toward (e.g. a point on a letter).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinTarget {
    pub target: Vec2,
    /// Fraction of the remaining distance applied per tick.
    pub force: f32,
}

/// Everything needed to spawn a particle.
///
/// Every recognized field is listed here with its default; construct with
/// struct update syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSpec {
    /// Draw radius in pixels.
    pub radius: f32,
    /// Hue in degrees.
    pub hue: f32,
    /// Saturation in percent.
    pub saturation: f32,
    /// Lightness in percent.
    pub lightness: f32,
    /// Base opacity.
    pub alpha: f32,
    /// Life lost per second. `0.0` means immortal.
    pub decay: f32,
    /// Bloom generation that produced the particle.
    pub generation: u32,
    /// Memory node this particle embodies.
    pub memory: Option<NodeIndex>,
    /// Initial velocity in pixels per tick.
    pub velocity: Vec2,
    /// Number of trail samples kept.
    pub trail_length: usize,
}

impl Default for ParticleSpec {
    fn default() -> Self {
        Self {
            radius: 2.0,
            hue: 200.0,
            saturation: 60.0,
            lightness: 70.0,
            alpha: 0.8,
            decay: 0.0,
            generation: 0,
            memory: None,
            velocity: Vec2::ZERO,
            trail_length: 0,
        }
    }
}

impl ParticleSpec {
    /// Spec for the particle embodying a memory node.
    pub fn memory(node: NodeIndex) -> Self {
        Self {
            radius: 3.2,
            hue: 45.0,
            saturation: 80.0,
            lightness: 72.0,
            alpha: 0.55,
            memory: Some(node),
            trail_length: 6,
            ..Default::default()
        }
    }
}

/// A single Verlet particle.
#[derive(Debug, Clone)]
pub struct Particle {
    handle: ParticleHandle,
    pub pos: Vec2,
    pub prev: Vec2,
    pub radius: f32,
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub alpha: f32,
    pub decay: f32,
    /// Remaining life in `0.0..=1.0`.
    pub life: f32,
    pub pin: Option<PinTarget>,
    pub generation: u32,
    pub memory: Option<NodeIndex>,
    /// Per-particle phase used for wobble and twinkle.
    pub phase: f32,
    trail: VecDeque<Vec2>,
    trail_capacity: usize,
}

impl Particle {
    fn new(handle: ParticleHandle, pos: Vec2, spec: &ParticleSpec) -> Self {
        Self {
            handle,
            pos,
            prev: pos - spec.velocity,
            radius: spec.radius,
            hue: spec.hue,
            saturation: spec.saturation,
            lightness: spec.lightness,
            alpha: spec.alpha,
            decay: spec.decay,
            life: 1.0,
            pin: None,
            generation: spec.generation,
            memory: spec.memory,
            phase: (handle.0 as f32 * 2.399_963).rem_euclid(std::f32::consts::TAU),
            trail: VecDeque::with_capacity(spec.trail_length),
            trail_capacity: spec.trail_length,
        }
    }

    #[inline]
    pub fn handle(&self) -> ParticleHandle {
        self.handle
    }

    /// Implicit velocity in pixels per tick.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.pos - self.prev
    }

    /// Overwrite the implicit velocity without moving the particle.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.prev = self.pos - velocity;
    }

    /// Scale the implicit velocity (extra damping).
    pub fn damp_velocity(&mut self, factor: f32) {
        let v = self.velocity() * factor;
        self.prev = self.pos - v;
    }

    /// Verlet step: `pos += (pos - prev) * damping`.
    pub fn integrate(&mut self, damping: f32) {
        let v = (self.pos - self.prev) * damping;
        self.prev = self.pos;
        self.pos += v;
    }

    /// Nudge the position directly. In Verlet this also changes velocity.
    #[inline]
    pub fn apply_impulse(&mut self, delta: Vec2) {
        self.pos += delta;
    }

    /// Teleport to `pos` at rest, dropping the trail.
    pub fn reset_to(&mut self, pos: Vec2) {
        self.pos = pos;
        self.prev = pos;
        self.trail.clear();
    }

    /// Push the current position onto the bounded trail.
    pub fn record_trail_sample(&mut self) {
        if self.trail_capacity == 0 {
            return;
        }
        while self.trail.len() >= self.trail_capacity {
            self.trail.pop_front();
        }
        self.trail.push_back(self.pos);
    }

    /// Trail samples, oldest first.
    pub fn trail(&self) -> impl ExactSizeIterator<Item = &Vec2> + '_ {
        self.trail.iter()
    }

    pub fn trail_capacity(&self) -> usize {
        self.trail_capacity
    }

    /// Change the trail bound, dropping the oldest samples if it shrinks.
    pub fn set_trail_capacity(&mut self, capacity: usize) {
        self.trail_capacity = capacity;
        while self.trail.len() > capacity {
            self.trail.pop_front();
        }
    }

    /// Lose life proportionally to elapsed seconds.
    pub fn decay(&mut self, dt: f32) {
        if self.decay > 0.0 {
            self.life = (self.life - self.decay * dt).max(0.0);
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.life <= 0.0
    }

    #[inline]
    pub fn is_memory(&self) -> bool {
        self.memory.is_some()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.prev.is_finite()
    }
}

/// Pool owning every live particle.
#[derive(Debug, Clone)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    slots: HashMap<ParticleHandle, usize>,
    capacity: usize,
    next_id: u64,
}

impl ParticleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
            capacity,
            next_id: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.capacity
    }

    /// Spawn a particle. Returns `None` when the pool is at capacity.
    pub fn add(&mut self, pos: Vec2, spec: &ParticleSpec) -> Option<ParticleHandle> {
        if self.is_full() {
            return None;
        }
        let handle = ParticleHandle(self.next_id);
        self.next_id += 1;
        self.slots.insert(handle, self.particles.len());
        self.particles.push(Particle::new(handle, pos, spec));
        Some(handle)
    }

    /// Remove a particle in O(1) by swapping the last one into its slot.
    pub fn remove(&mut self, handle: ParticleHandle) -> Option<Particle> {
        let slot = self.slots.remove(&handle)?;
        Some(self.swap_remove_slot(slot))
    }

    fn swap_remove_slot(&mut self, slot: usize) -> Particle {
        let removed = self.particles.swap_remove(slot);
        self.slots.remove(&removed.handle);
        if let Some(moved) = self.particles.get(slot) {
            self.slots.insert(moved.handle, slot);
        }
        removed
    }

    pub fn contains(&self, handle: ParticleHandle) -> bool {
        self.slots.contains_key(&handle)
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots.get(&handle).map(|&i| &self.particles[i])
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        match self.slots.get(&handle) {
            Some(&i) => self.particles.get_mut(i),
            None => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    /// Live particles in slot order. Slot order changes on removal.
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Remove every particle whose life reached zero. Returns how many died.
    pub fn sweep_dead(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].is_dead() {
                self.swap_remove_slot(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Change the capacity. When shrinking, the oldest non-memory particles
    /// are evicted until the pool fits. Returns how many were evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        if self.particles.len() <= capacity {
            return 0;
        }
        let excess = self.particles.len() - capacity;
        let mut victims: Vec<ParticleHandle> = self
            .particles
            .iter()
            .filter(|p| !p.is_memory())
            .map(|p| p.handle)
            .collect();
        victims.sort_unstable();
        victims.truncate(excess);
        for handle in &victims {
            self.remove(*handle);
        }
        victims.len()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.slots.clear();
    }
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_until_full() {
        let mut store = ParticleStore::new(3);
        let spec = ParticleSpec::default();
        for _ in 0..3 {
            assert!(store.add(Vec2::ZERO, &spec).is_some());
        }
        assert!(store.is_full());
        assert!(store.add(Vec2::ZERO, &spec).is_none());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_swap_remove_keeps_handles_valid() {
        let mut store = ParticleStore::new(10);
        let spec = ParticleSpec::default();
        let a = store.add(Vec2::new(1.0, 0.0), &spec).unwrap();
        let b = store.add(Vec2::new(2.0, 0.0), &spec).unwrap();
        let c = store.add(Vec2::new(3.0, 0.0), &spec).unwrap();

        let removed = store.remove(a).unwrap();
        assert_eq!(removed.pos.x, 1.0);
        assert!(store.get(a).is_none());
        assert_eq!(store.get(b).unwrap().pos.x, 2.0);
        assert_eq!(store.get(c).unwrap().pos.x, 3.0);
        assert!(store.remove(a).is_none());
    }

    #[test]
    fn test_handles_are_unique_after_removal() {
        let mut store = ParticleStore::new(2);
        let spec = ParticleSpec::default();
        let a = store.add(Vec2::ZERO, &spec).unwrap();
        store.remove(a);
        let b = store.add(Vec2::ZERO, &spec).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verlet_integrate() {
        let mut store = ParticleStore::new(1);
        let spec = ParticleSpec {
            velocity: Vec2::new(2.0, 0.0),
            ..Default::default()
        };
        let h = store.add(Vec2::new(10.0, 10.0), &spec).unwrap();
        let p = store.get_mut(h).unwrap();
        p.integrate(0.5);
        assert_eq!(p.pos, Vec2::new(11.0, 10.0));
        assert_eq!(p.prev, Vec2::new(10.0, 10.0));

        // Impulse is a positional nudge that also shows up as velocity
        p.apply_impulse(Vec2::new(0.0, 3.0));
        assert_eq!(p.velocity(), Vec2::new(1.0, 3.0));
    }

    #[test]
    fn test_trail_is_bounded() {
        let mut store = ParticleStore::new(1);
        let spec = ParticleSpec {
            trail_length: 3,
            ..Default::default()
        };
        let h = store.add(Vec2::ZERO, &spec).unwrap();
        let p = store.get_mut(h).unwrap();
        for i in 0..5 {
            p.pos = Vec2::new(i as f32, 0.0);
            p.record_trail_sample();
        }
        let xs: Vec<f32> = p.trail().map(|v| v.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_decay_and_sweep() {
        let mut store = ParticleStore::new(4);
        let mortal = ParticleSpec {
            decay: 0.5,
            ..Default::default()
        };
        let immortal = ParticleSpec::default();
        let a = store.add(Vec2::ZERO, &mortal).unwrap();
        let b = store.add(Vec2::ZERO, &immortal).unwrap();

        for p in store.iter_mut() {
            p.decay(1.0);
        }
        assert_eq!(store.sweep_dead(), 0);
        for p in store.iter_mut() {
            p.decay(1.0);
        }
        assert_eq!(store.sweep_dead(), 1);
        assert!(!store.contains(a));
        assert!(store.contains(b));
    }

    #[test]
    fn test_shrink_capacity_spares_memory() {
        let mut store = ParticleStore::new(5);
        let memory = store.add(Vec2::ZERO, &ParticleSpec::memory(0)).unwrap();
        for _ in 0..4 {
            store.add(Vec2::ZERO, &ParticleSpec::default());
        }
        let evicted = store.set_capacity(2);
        assert_eq!(evicted, 3);
        assert_eq!(store.len(), 2);
        assert!(store.contains(memory));
    }
}
