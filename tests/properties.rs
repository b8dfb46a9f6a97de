//! Property tests for the pieces every frame leans on.

use organism::circadian::CircadianProfile;
use organism::memory::string_to_melody;
use organism::particle::{ParticleSpec, ParticleStore};
use organism::spatial::{SpatialConfig, SpatialIndex};
use organism::time::cap_delta;
use organism::visuals::lerp_hue;
use organism::{InputEvent, MemoryGraph, Organism, OrganismConfig, Vec2};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Vec2> {
    (-500.0f32..500.0, -500.0f32..500.0).prop_map(|(x, y)| Vec2::new(x, y))
}

#[derive(Debug, Clone)]
enum PoolOp {
    Add(Vec2),
    Remove(usize),
    Shrink(usize),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        4 => point().prop_map(PoolOp::Add),
        2 => (0usize..64).prop_map(PoolOp::Remove),
        1 => (1usize..40).prop_map(PoolOp::Shrink),
    ]
}

fn host_event() -> impl Strategy<Value = InputEvent> {
    let pos = (0.0f32..800.0, 0.0f32..600.0).prop_map(|(x, y)| Vec2::new(x, y));
    prop_oneof![
        pos.clone().prop_map(|pos| InputEvent::PointerMove { pos }),
        pos.clone().prop_map(|pos| InputEvent::PointerDown { pos }),
        pos.clone().prop_map(|pos| InputEvent::PointerUp { pos }),
        Just(InputEvent::PointerLeave),
        (0u64..3, pos.clone()).prop_map(|(id, pos)| InputEvent::TouchStart { id, pos }),
        (0u64..3, pos).prop_map(|(id, pos)| InputEvent::TouchMove { id, pos }),
        (0u64..3).prop_map(|id| InputEvent::TouchEnd { id }),
        (-3.0f32..3.0).prop_map(|delta| InputEvent::Zoom { delta }),
        (-180.0f32..180.0, -90.0f32..90.0)
            .prop_map(|(beta, gamma)| InputEvent::Orientation { beta, gamma }),
    ]
}

proptest! {
    #[test]
    fn spatial_query_finds_every_point_in_range(
        points in prop::collection::vec(point(), 0..200),
        center in point(),
        radius in 0.0f32..120.0,
        cell_size in 4.0f32..80.0,
    ) {
        let mut index = SpatialIndex::new(SpatialConfig { cell_size });
        for (i, &p) in points.iter().enumerate() {
            index.insert(p, i);
        }
        let found = index.query(center, radius);
        for (i, &p) in points.iter().enumerate() {
            if p.distance_squared(center) <= radius * radius {
                prop_assert!(found.contains(&i), "missed point {} at {}", i, p);
            }
        }
    }

    #[test]
    fn pool_respects_capacity(ops in prop::collection::vec(pool_op(), 0..200)) {
        let mut store = ParticleStore::new(32);
        let mut handles = Vec::new();
        for op in ops {
            match op {
                PoolOp::Add(pos) => {
                    if let Some(h) = store.add(pos, &ParticleSpec::default()) {
                        handles.push(h);
                    }
                }
                PoolOp::Remove(i) if !handles.is_empty() => {
                    let h = handles.swap_remove(i % handles.len());
                    store.remove(h);
                }
                PoolOp::Remove(_) => {}
                PoolOp::Shrink(cap) => {
                    store.set_capacity(cap);
                }
            }
            prop_assert!(store.len() <= store.capacity());
            handles.retain(|&h| store.contains(h));
            for &h in &handles {
                prop_assert_eq!(store.get(h).map(|p| p.handle()), Some(h));
            }
        }
    }

    #[test]
    fn capped_delta_is_bounded(dt in any::<f32>()) {
        let capped = cap_delta(dt);
        prop_assert!((0.0..=0.05).contains(&capped));
    }

    #[test]
    fn hue_blend_stays_on_circle(a in -720.0f32..720.0, b in -720.0f32..720.0, t in 0.0f32..=1.0) {
        let h = lerp_hue(a, b, t);
        prop_assert!((0.0..=360.0).contains(&h));
    }

    #[test]
    fn melody_is_short_and_in_octave(text in ".{0,40}") {
        let melody = string_to_melody(&text);
        prop_assert!(melody.len() <= 5);
        prop_assert!(melody.iter().all(|d| (0..12).contains(d)));
    }

    #[test]
    fn circadian_profile_is_well_formed(hour in -48.0f32..48.0) {
        let profile = CircadianProfile::at_hour(hour);
        prop_assert!((0.0..=1.0).contains(&profile.blend));
        prop_assert!(profile.speed > 0.0);
        prop_assert!(profile.trail_samples() > 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn particles_stay_finite_under_any_input(
        events in prop::collection::vec((host_event(), 1u32..4), 1..120),
        seed in any::<u64>(),
    ) {
        let graph = MemoryGraph::builtin().unwrap();
        let mut org = Organism::with_seed(graph, OrganismConfig::default(), 800.0, 600.0, seed)
            .unwrap()
            .with_hour(18.5);
        org.start();
        for (event, frames) in events {
            org.handle_input(event);
            for _ in 0..frames {
                org.update(1.0 / 60.0);
            }
        }
        prop_assert!(org.particles().iter().all(|p| p.pos.is_finite() && p.prev.is_finite()));
        prop_assert!(org.particles().len() <= org.particles().capacity());
        prop_assert!((0.5..=2.5).contains(&org.zoom()));
    }
}
