//! # organism
//!
//! A generative particle organism: a few hundred Verlet particles that
//! breathe, follow the pointer, fold into letterforms and slowly reveal a
//! constellation of memories as they are explored, scored live by a small
//! procedural synthesizer whose mood follows the time of day.
//!
//! ## Quick Start
//!
//! ```ignore
//! use organism::prelude::*;
//!
//! let graph = MemoryGraph::builtin()?;
//! let mut organism = Organism::new(graph, OrganismConfig::default(), 1280.0, 720.0)?;
//! organism.on_constellation_complete(|| println!("all memories found"));
//! organism.start();
//!
//! let mut canvas = DrawList::new(1280.0, 720.0);
//! loop {
//!     organism.handle_input(InputEvent::PointerMove { pos: Vec2::new(640.0, 360.0) });
//!     organism.update(1.0 / 60.0);
//!     organism.draw(&mut canvas);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! [`ParticleStore`] is a fixed-capacity pool. Particles move by Verlet
//! integration: velocity is implicit (`pos - prev`) and an impulse is a direct
//! positional nudge. Memory particles embody nodes of the [`MemoryGraph`].
//!
//! ### Discovery
//!
//! Hovering near a memory particle warms it, dwelling discovers it. Each
//! discovery fires a shockwave, links the node to already discovered
//! neighbors, plays a melody derived from its label and pulls free particles
//! into the label's letterforms. See [`DiscoverySystem`].
//!
//! ### Time of day
//!
//! [`CircadianProfile`] maps the local hour to palette, speed, breathing and
//! musical mood, crossfading near phase boundaries.
//!
//! ### Audio
//!
//! [`AudioEngine`] renders mono samples on demand: detuned drones, a
//! Karplus-Strong pluck pool, a noise bed and a procedural reverb. It stays
//! silent until a host gesture enables it.
//!
//! ### Drawing
//!
//! The organism draws through the [`Canvas`] trait. [`DrawList`] records the
//! calls for hosts that batch (the `viewer` feature renders them with wgpu).

pub mod audio;
pub mod circadian;
pub mod config;
pub mod discovery;
pub mod draw;
pub mod error;
pub mod glyphs;
pub mod input;
pub mod memory;
pub mod organism;
pub mod particle;
pub mod quality;
pub mod spatial;
pub mod time;
pub mod visuals;

pub use audio::{AudioConfig, AudioEngine, Mood, Scale};
pub use circadian::{CircadianClock, CircadianProfile, Phase};
pub use config::{EffectsConfig, OrganismConfig, PhysicsConfig};
pub use discovery::{DiscoveryConfig, DiscoveryEvent, DiscoverySystem, NodeState};
pub use draw::{Canvas, DrawCommand, DrawList};
pub use error::{ConfigError, GraphError, OrganismError};
pub use glam::Vec2;
pub use glyphs::text_to_glyph_positions;
pub use input::{InputEvent, InputSnapshot, InputUnifier, Modality};
pub use memory::{string_to_melody, MemoryGraph, MemoryNode, MemoryRecord, NodeIndex, NodeKind};
pub use organism::{Activation, DiscoveredPosition, DiscoveryCount, Organism};
pub use particle::{Particle, ParticleHandle, ParticleSpec, ParticleStore};
pub use quality::{AdaptiveQuality, QualityConfig};
pub use spatial::{SpatialConfig, SpatialIndex};
pub use time::{Scheduler, Time};
pub use visuals::{GlowMode, GlowSprite, Hsl, Rgb, Rgba};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use organism::prelude::*;
/// ```
///
/// This imports:
/// - [`Organism`] and its config, [`OrganismConfig`]
/// - [`MemoryGraph`] - the memory table
/// - [`InputEvent`] - raw host input
/// - [`Canvas`] / [`DrawList`] - the drawing seam
/// - [`Vec2`] - glam vector type
pub mod prelude {
    pub use crate::audio::{Mood, Scale};
    pub use crate::circadian::CircadianProfile;
    pub use crate::config::OrganismConfig;
    pub use crate::draw::{Canvas, DrawCommand, DrawList};
    pub use crate::error::OrganismError;
    pub use crate::input::{InputEvent, Modality};
    pub use crate::memory::{MemoryGraph, NodeKind};
    pub use crate::organism::{Activation, DiscoveredPosition, DiscoveryCount, Organism};
    pub use crate::time::Time;
    pub use crate::visuals::{Hsl, Rgb, Rgba};
    pub use crate::Vec2;
}
