//! The per-tick force pass.
//!
//! Forces are accumulated per particle as a positional delta, then applied as
//! one Verlet step. Order matters only for readability; every term is
//! additive:
//!
//! 1. cohesion toward the center, scaled by the circadian speed
//! 2. breathing, a shared sinusoid pushing in and out
//! 3. separation from neighbors found through the spatial index
//! 4. pointer attraction with linear falloff (non-memory only)
//! 5. membrane pull toward the segment between two touches
//! 6. device tilt
//! 7. text-formation pin, with extra damping near the target
//! 8. settled memory particles: anchor spring and wobble instead of 1-6
//! 9. shockwave ring push (non-memory only)

use crate::config::PhysicsConfig;
use crate::discovery::Shockwave;
use crate::input::InputSnapshot;
use crate::particle::ParticleStore;
use crate::spatial::SpatialIndex;
use glam::Vec2;

/// Per-tick inputs that do not live on the particles.
pub(crate) struct Forces<'a> {
    pub config: &'a PhysicsConfig,
    pub center: Vec2,
    /// Cohesion coefficient after circadian speed, zoom and intro scaling.
    pub cohesion: f32,
    /// Signed breathing displacement this tick.
    pub breath: f32,
    pub input: &'a InputSnapshot,
    pub shockwaves: &'a [Shockwave],
    /// Anchor per node index for settled (discovered) memory nodes.
    pub anchors: &'a [Option<Vec2>],
    /// One-shot impulse from a swipe.
    pub swipe: Option<Vec2>,
    /// Session clock, for wobble.
    pub clock: f32,
}

/// Reusable buffers for the force pass.
#[derive(Debug, Default)]
pub(crate) struct PhysicsScratch {
    positions: Vec<Vec2>,
    deltas: Vec<Vec2>,
    snap: Vec<bool>,
    neighbors: Vec<usize>,
}

/// Closest point to `p` on segment `a-b`.
pub fn project_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Run one physics tick. Returns how many particles died.
pub(crate) fn step(
    particles: &mut ParticleStore,
    index: &mut SpatialIndex<usize>,
    scratch: &mut PhysicsScratch,
    forces: &Forces<'_>,
    dt: f32,
) -> usize {
    let cfg = forces.config;
    let n = particles.len();

    scratch.positions.clear();
    scratch.positions.extend(particles.iter().map(|p| p.pos));
    scratch.deltas.clear();
    scratch.deltas.resize(n, Vec2::ZERO);
    scratch.snap.clear();
    scratch.snap.resize(n, false);

    index.clear();
    for (i, &pos) in scratch.positions.iter().enumerate() {
        index.insert(pos, i);
    }

    let pointer = forces.input.position.map(|_| forces.input.smoothed);

    for (i, p) in particles.iter().enumerate() {
        let pos = scratch.positions[i];
        let mut delta = Vec2::ZERO;

        let anchor = p
            .memory
            .and_then(|node| forces.anchors.get(node).copied().flatten());

        if let Some(anchor) = anchor {
            // 8. settled
            delta += (anchor - pos) * cfg.anchor_spring;
            let t = forces.clock + p.phase;
            delta += Vec2::new((t * 1.3).sin(), (t * 1.7).cos()) * cfg.wobble;
        } else {
            // 1. cohesion
            let to_center = forces.center - pos;
            delta += to_center * forces.cohesion;

            // 2. breathing
            let dist = to_center.length();
            if dist > f32::EPSILON {
                delta -= to_center / dist * forces.breath;
            }

            // 3. separation
            index.query_into(pos, cfg.separation_radius, &mut scratch.neighbors);
            for &j in &scratch.neighbors {
                if j == i {
                    continue;
                }
                let away = pos - scratch.positions[j];
                let mut d = away.length();
                if d <= f32::EPSILON {
                    d = 1.0;
                }
                let overlap = (cfg.separation_radius - d).max(0.0);
                delta += away / d * overlap * cfg.separation_strength;
            }

            // 4. pointer attraction
            if let (Some(target), false) = (pointer, p.is_memory()) {
                let to = target - pos;
                let d = to.length();
                if d > f32::EPSILON && d < cfg.attract_radius {
                    delta += to / d * cfg.attract_strength * (1.0 - d / cfg.attract_radius);
                }
            }

            // 5. membrane
            if let Some((a, b)) = forces.input.touch_segment {
                let offset = project_on_segment(pos, a, b) - pos;
                if offset.length() < cfg.membrane_radius {
                    delta += offset * cfg.membrane_strength;
                }
            }

            // 6. tilt
            if let Some(tilt) = forces.input.tilt {
                delta += tilt * cfg.tilt_strength;
            }

            if let (Some(swipe), false) = (forces.swipe, p.is_memory()) {
                delta += swipe * cfg.swipe_impulse;
            }
        }

        // 7. text formation
        if let Some(pin) = p.pin {
            let to = pin.target - pos;
            delta += to * pin.force;
            if to.length() < cfg.text_snap_radius {
                scratch.snap[i] = true;
            }
        }

        // 9. shockwaves
        if !p.is_memory() {
            for wave in forces.shockwaves {
                let from = pos - wave.origin;
                let mut d = from.length();
                if (d - wave.radius()).abs() < cfg.shock_ring {
                    if d <= f32::EPSILON {
                        d = 1.0;
                    }
                    delta += from / d * cfg.shock_strength * wave.amplitude();
                }
            }
        }

        scratch.deltas[i] = delta;
    }

    for (i, p) in particles.iter_mut().enumerate() {
        p.apply_impulse(scratch.deltas[i]);
        if scratch.snap[i] {
            p.damp_velocity(0.6);
        }
        p.integrate(cfg.damping);
        if !p.is_finite() {
            p.reset_to(forces.center);
        }
        p.record_trail_sample();
        p.decay(dt);
    }

    particles.sweep_dead()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleSpec;
    use crate::spatial::SpatialConfig;

    struct Rig {
        config: PhysicsConfig,
        input: InputSnapshot,
        store: ParticleStore,
        index: SpatialIndex<usize>,
        scratch: PhysicsScratch,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                config: PhysicsConfig::default(),
                input: InputSnapshot::default(),
                store: ParticleStore::new(64),
                index: SpatialIndex::new(SpatialConfig::default()),
                scratch: PhysicsScratch::default(),
            }
        }

        fn step(&mut self, anchors: &[Option<Vec2>], shockwaves: &[Shockwave]) -> usize {
            let forces = Forces {
                config: &self.config,
                center: Vec2::new(400.0, 300.0),
                cohesion: self.config.cohesion,
                breath: 0.0,
                input: &self.input,
                shockwaves,
                anchors,
                swipe: None,
                clock: 0.0,
            };
            step(
                &mut self.store,
                &mut self.index,
                &mut self.scratch,
                &forces,
                1.0 / 60.0,
            )
        }
    }

    #[test]
    fn test_cohesion_pulls_inward() {
        let mut rig = Rig::new();
        let h = rig.store.add(Vec2::new(600.0, 300.0), &ParticleSpec::default()).unwrap();
        for _ in 0..30 {
            rig.step(&[], &[]);
        }
        assert!(rig.store.get(h).unwrap().pos.x < 600.0);
    }

    #[test]
    fn test_coincident_particles_separate() {
        let mut rig = Rig::new();
        let a = rig.store.add(Vec2::new(100.0, 100.0), &ParticleSpec::default()).unwrap();
        let b = rig.store.add(Vec2::new(100.0, 100.0), &ParticleSpec::default()).unwrap();
        rig.step(&[], &[]);
        let pa = rig.store.get(a).unwrap().pos;
        let pb = rig.store.get(b).unwrap().pos;
        assert!(pa.is_finite() && pb.is_finite());
    }

    #[test]
    fn test_pointer_attracts_only_free_particles() {
        let mut rig = Rig::new();
        rig.config.cohesion = 0.0;
        let free = rig.store.add(Vec2::new(100.0, 100.0), &ParticleSpec::default()).unwrap();
        let memory = rig
            .store
            .add(Vec2::new(100.0, 200.0), &ParticleSpec::memory(0))
            .unwrap();
        rig.input.position = Some(Vec2::new(100.0, 250.0));
        rig.input.smoothed = Vec2::new(100.0, 150.0);
        rig.step(&[], &[]);
        assert!(rig.store.get(free).unwrap().pos.y > 100.0);
        assert_eq!(rig.store.get(memory).unwrap().pos.y, 200.0);
    }

    #[test]
    fn test_settled_memory_springs_to_anchor() {
        let mut rig = Rig::new();
        rig.config.wobble = 0.0;
        let h = rig
            .store
            .add(Vec2::new(100.0, 100.0), &ParticleSpec::memory(0))
            .unwrap();
        let anchors = [Some(Vec2::new(400.0, 300.0))];
        for _ in 0..600 {
            rig.step(&anchors, &[]);
        }
        let pos = rig.store.get(h).unwrap().pos;
        assert!(pos.distance(Vec2::new(400.0, 300.0)) < 1.0, "{pos}");
    }

    #[test]
    fn test_shockwave_pushes_ring() {
        let mut rig = Rig::new();
        rig.config.cohesion = 0.0;
        let h = rig.store.add(Vec2::new(500.0, 300.0), &ParticleSpec::default()).unwrap();
        let wave = Shockwave {
            origin: Vec2::new(400.0, 300.0),
            age: 100.0 / 260.0,
            max_age: 1.6,
            speed: 260.0,
        };
        rig.step(&[], &[wave]);
        assert!(rig.store.get(h).unwrap().pos.x > 500.0);
    }

    #[test]
    fn test_non_finite_snaps_to_center() {
        let mut rig = Rig::new();
        let h = rig.store.add(Vec2::new(10.0, 10.0), &ParticleSpec::default()).unwrap();
        rig.store.get_mut(h).unwrap().prev = Vec2::new(f32::NAN, 0.0);
        rig.step(&[], &[]);
        assert_eq!(rig.store.get(h).unwrap().pos, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_membrane_projection() {
        let p = project_on_segment(Vec2::new(5.0, 5.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(p, Vec2::new(5.0, 0.0));
        let clamped = project_on_segment(Vec2::new(-5.0, 5.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(clamped, Vec2::ZERO);
    }

    #[test]
    fn test_dead_particles_are_swept() {
        let mut rig = Rig::new();
        let spec = ParticleSpec {
            decay: 100.0,
            ..Default::default()
        };
        rig.store.add(Vec2::new(400.0, 300.0), &spec).unwrap();
        assert_eq!(rig.step(&[], &[]), 1);
        assert!(rig.store.is_empty());
    }
}
