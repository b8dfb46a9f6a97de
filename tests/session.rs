//! End-to-end session tests.
//!
//! These drive a whole [`Organism`] through its public surface the way a host
//! does: raw input events in, `update` per frame, callbacks and queries out.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use organism::prelude::*;
use organism::audio::ContextState;

const DT: f32 = 1.0 / 60.0;

fn still_config() -> OrganismConfig {
    let mut config = OrganismConfig::default();
    config.physics.cohesion = 0.0;
    config.physics.breathing = 0.0;
    config.audio.sample_rate = 8_000.0;
    config.audio.reverb_secs = 0.5;
    config
}

fn session(config: OrganismConfig) -> Organism {
    let graph = MemoryGraph::builtin().unwrap();
    let mut org = Organism::with_seed(graph, config, 800.0, 600.0, 42)
        .unwrap()
        .with_hour(9.0);
    org.start();
    org
}

/// Keep the pointer on `id`'s particle for `seconds`.
fn hover(org: &mut Organism, id: &str, seconds: f32) {
    let frames = (seconds / DT).ceil() as usize;
    for _ in 0..frames {
        if let Some(pos) = org.position_of(id) {
            org.handle_input(InputEvent::PointerMove { pos });
        }
        org.update(DT);
    }
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_dwelling_discovers_node() {
    let mut org = session(still_config());
    let counts = Rc::new(RefCell::new(Vec::new()));
    let seen = counts.clone();
    org.on_discovery_change(move |count| seen.borrow_mut().push(count));

    hover(&mut org, "origin", 0.5);
    assert_eq!(org.discovery_count().discovered, 0);

    hover(&mut org, "origin", 1.5);
    assert_eq!(org.discovery_count().discovered, 1);
    assert_eq!(
        *counts.borrow(),
        vec![DiscoveryCount {
            discovered: 1,
            total: 9
        }]
    );

    let found = org.discovered_positions();
    assert_eq!(found[0].id, "origin");
    assert_eq!(found[0].label, "Coder");
    assert_eq!(org.forming_text(), Some("Coder"));
}

#[test]
fn test_touch_discovers_faster() {
    let mut org = session(still_config());
    let frames = (1.1 / DT).ceil() as usize;
    org.handle_input(InputEvent::TouchStart {
        id: 1,
        pos: org.position_of("music").unwrap(),
    });
    for _ in 0..frames {
        let pos = org.position_of("music").unwrap();
        org.handle_input(InputEvent::TouchMove { id: 1, pos });
        org.update(DT);
    }
    assert!(org.graph().node(org.graph().index_of("music").unwrap()).unwrap().is_discovered());
}

#[test]
fn test_leaving_resets_dwell() {
    let mut org = session(still_config());
    hover(&mut org, "origin", 1.0);
    org.handle_input(InputEvent::PointerLeave);
    org.update(DT);
    hover(&mut org, "origin", 1.0);
    assert_eq!(org.discovery_count().discovered, 0);
}

#[test]
fn test_discovered_flag_is_monotonic() {
    let mut org = session(still_config());
    org.discover("lattice");
    for i in 0..300 {
        org.handle_input(InputEvent::PointerMove {
            pos: Vec2::new(i as f32 * 3.0, 300.0),
        });
        org.update(DT);
    }
    org.resize(1024.0, 768.0);
    let node = org.graph().index_of("lattice").unwrap();
    assert!(org.graph().node(node).unwrap().is_discovered());
    assert_eq!(org.discovery_count().discovered, 1);
}

#[test]
fn test_discovered_memory_settles_on_anchor() {
    let mut config = still_config();
    config.physics.wobble = 0.0;
    let mut org = session(config);
    org.discover("origin");
    for _ in 0..900 {
        org.update(DT);
    }
    let pos = org.position_of("origin").unwrap();
    assert!(pos.distance(Vec2::new(400.0, 300.0)) < 5.0, "{pos}");
}

#[test]
fn test_root_discovery_end_to_end() {
    let mut org = session(still_config());
    org.enable_audio();
    let root = org.graph().root();
    let root_id = org.graph().node(root).unwrap().id().to_string();

    assert!(org.discover(&root_id));
    assert_eq!(org.discovery().shockwaves().len(), 1);
    assert_eq!(org.graph().node(root).unwrap().anchor, Some(org.center()));
    assert_eq!(org.last_melody(), &[2, 2, 3, 4, 5]);
    assert!(org.audio().pending_len() >= 5);
}

#[test]
fn test_melody_reaches_audio_when_enabled() {
    let mut org = session(still_config());
    assert!(org.enable_audio());
    org.discover("origin");
    assert_eq!(org.last_melody(), &[2, 2, 3, 4, 5]);
    assert!(org.audio().pending_len() >= 5);

    let mut block = vec![0.0; 4_000];
    for _ in 0..60 {
        org.update(DT);
    }
    org.render_audio(&mut block);
    assert!(block.iter().any(|s| s.abs() > 1e-4));
    assert!(block.iter().all(|s| s.abs() <= 1.0));
}

// ============================================================================
// Completion
// ============================================================================

#[test]
fn test_constellation_completes_once() {
    let mut org = session(still_config());
    let completions = Rc::new(Cell::new(0));
    let seen = completions.clone();
    org.on_constellation_complete(move || seen.set(seen.get() + 1));

    let ids: Vec<String> = org
        .graph()
        .nodes()
        .iter()
        .map(|n| n.id().to_string())
        .collect();
    for id in &ids {
        org.discover(id);
    }
    for id in &ids {
        assert!(!org.discover(id));
    }
    for _ in 0..120 {
        org.update(DT);
    }

    assert_eq!(completions.get(), 1);
    assert_eq!(org.discovery_count().discovered, org.discovery_count().total);
    assert_eq!(org.discovered_positions().len(), ids.len());
    assert_eq!(org.discovery().hint_level(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_destroy_tears_everything_down() {
    let mut org = session(still_config());
    org.enable_audio();
    org.discover("origin");
    assert!(org.pending_actions() > 0);

    org.destroy();
    assert!(org.is_destroyed());
    assert!(!org.is_running());
    assert_eq!(org.pending_actions(), 0);
    assert_eq!(org.audio().context().state(), ContextState::Closed);
    assert_eq!(org.audio().pending_len(), 0);

    let clock = org.clock();
    org.handle_input(InputEvent::PointerMove {
        pos: Vec2::new(10.0, 10.0),
    });
    org.start();
    org.update(DT);
    assert_eq!(org.clock(), clock);
    assert!(!org.discover("lattice"));

    let mut block = vec![1.0; 64];
    org.render_audio(&mut block);
    assert!(block.iter().all(|&s| s == 0.0));
}

#[test]
fn test_destroyed_session_ignores_host_calls() {
    let mut org = session(still_config());
    org.discover("origin");
    org.focus_next();
    assert_eq!(org.focus_next(), Some(1));

    let calls = Rc::new(Cell::new(0));
    let changes = calls.clone();
    org.on_discovery_change(move |_| changes.set(changes.get() + 1));
    let revisits = calls.clone();
    org.on_revisit(move |_| revisits.set(revisits.get() + 1));

    let origin = org.position_of("origin").unwrap();
    let shockwaves = org.discovery().shockwaves().len();
    org.destroy();

    assert_eq!(org.activate(), Activation::None);
    assert!(org.click(origin).is_none());
    assert_eq!(org.focus_next(), None);
    assert_eq!(org.focus_previous(), None);
    assert!(!org.start_tour());
    org.resize(1024.0, 768.0);

    assert_eq!(org.pending_actions(), 0);
    assert_eq!(calls.get(), 0);
    assert_eq!(org.discovery_count().discovered, 1);
    assert_eq!(org.discovery().shockwaves().len(), shockwaves);
    assert_eq!(org.size(), Vec2::new(800.0, 600.0));
    assert_eq!(org.forming_text(), None);
}

#[test]
fn test_stop_pauses_without_losing_state() {
    let mut org = session(still_config());
    org.discover("origin");
    org.update(DT);
    org.stop();
    let clock = org.clock();
    for _ in 0..10 {
        org.update(DT);
    }
    assert_eq!(org.clock(), clock);
    org.start();
    org.update(DT);
    assert!(org.clock() > clock);
    assert_eq!(org.discovery_count().discovered, 1);
}

#[test]
fn test_pool_stays_within_capacity() {
    let mut config = still_config();
    config.physics.capacity = 260;
    config.effects.bloom_threshold = 20.0;
    let mut org = session(config);
    for i in 0..600 {
        let x = 200.0 + ((i * 37) % 400) as f32;
        org.handle_input(InputEvent::PointerMove {
            pos: Vec2::new(x, 300.0),
        });
        org.update(DT);
        assert!(org.particles().len() <= 260);
    }
    assert!(org.generation() > 0);
}

#[test]
fn test_slow_frames_degrade_quality_once() {
    let mut org = session(still_config());
    let before = org.particles().len();
    for _ in 0..120 {
        org.update(0.04);
    }
    assert!(org.quality().is_degraded());
    assert_eq!(org.particles().capacity(), 300);
    assert!(org.particles().len() <= before);
    assert!(org.graph().nodes().iter().all(|n| n.particle.is_some()));
}

#[test]
fn test_draw_after_many_frames() {
    let mut org = session(OrganismConfig::default());
    let mut canvas = DrawList::new(800.0, 600.0);
    for i in 0..240 {
        let t = i as f32 * 0.05;
        org.handle_input(InputEvent::PointerMove {
            pos: Vec2::new(400.0 + 200.0 * t.cos(), 300.0 + 150.0 * t.sin()),
        });
        org.update(DT);
    }
    org.draw(&mut canvas);
    assert!(matches!(canvas.commands()[0], DrawCommand::Clear(_)));
    assert!(org.particles().iter().all(|p| p.pos.is_finite()));
}
