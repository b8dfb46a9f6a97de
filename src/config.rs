//! Session configuration.
//!
//! Every tunable lives in a plain struct with a `Default` and serde derives so
//! a whole session can be described by one JSON file. Missing fields fall
//! back to their defaults.
//!
//! ```ignore
//! let config = OrganismConfig::load("organism.json")?;
//! let organism = Organism::new(MemoryGraph::builtin()?, config, 1280.0, 720.0)?;
//! ```

use crate::audio::AudioConfig;
use crate::discovery::DiscoveryConfig;
use crate::error::ConfigError;
use crate::particle::DEFAULT_CAPACITY;
use crate::quality::QualityConfig;
use crate::spatial::SpatialConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Force constants for the per-tick physics pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Full-quality particle cap.
    pub capacity: usize,
    /// Particles spawned when the session starts.
    pub initial_particles: usize,
    /// Pull toward the center per pixel of offset.
    pub cohesion: f32,
    /// Breathing displacement in pixels per tick.
    pub breathing: f32,
    pub separation_radius: f32,
    pub separation_strength: f32,
    pub attract_radius: f32,
    pub attract_strength: f32,
    /// Distance from the touch segment within which the membrane pulls.
    pub membrane_radius: f32,
    pub membrane_strength: f32,
    pub tilt_strength: f32,
    /// Default pull toward a text-formation target.
    pub text_force: f32,
    /// Distance under which formation damping kicks in.
    pub text_snap_radius: f32,
    pub anchor_spring: f32,
    /// Wobble amplitude of settled memory particles, in pixels.
    pub wobble: f32,
    /// Thickness of the shockwave ring that pushes particles.
    pub shock_ring: f32,
    pub shock_strength: f32,
    /// Verlet damping.
    pub damping: f32,
    /// Scale applied to a swipe's velocity to get the one-shot impulse.
    pub swipe_impulse: f32,
    /// Fraction of the shorter viewport side used as the organism radius.
    pub radius_fraction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            initial_particles: 220,
            cohesion: 0.0008,
            breathing: 0.15,
            separation_radius: 14.0,
            separation_strength: 0.02,
            attract_radius: 160.0,
            attract_strength: 0.6,
            membrane_radius: 50.0,
            membrane_strength: 0.05,
            tilt_strength: 0.3,
            text_force: 0.08,
            text_snap_radius: 3.0,
            anchor_spring: 0.04,
            wobble: 0.15,
            shock_ring: 18.0,
            shock_strength: 2.0,
            damping: 0.97,
            swipe_impulse: 0.004,
            radius_fraction: 0.38,
        }
    }
}

/// Timings for intro, text formation, idle behavior, blooms and the tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Seconds the organism coalesces before `on_intro_complete`.
    pub intro_duration: f32,
    /// Cap height of formed labels in pixels.
    pub text_size: f32,
    /// Seconds a formed label holds.
    pub text_hold: f32,
    /// Seconds the pull fades out after the hold.
    pub text_release: f32,
    /// Idle seconds before ambient motes.
    pub idle_threshold: f32,
    /// Seconds between ambient motes while idle.
    pub idle_emit_interval: f32,
    /// Idle seconds before a discovered label re-forms.
    pub idle_text_threshold: f32,
    /// Minimum seconds between idle label re-forms.
    pub idle_text_cooldown: f32,
    /// Pointer travel (pixels) per bloom.
    pub bloom_threshold: f32,
    /// Particles per bloom.
    pub bloom_size: usize,
    /// Seconds the tour spends on each node.
    pub tour_dwell: f32,
    /// Seconds between completion pulse waves.
    pub pulse_interval: f32,
    /// Stellar-wind motes per second once complete.
    pub wind_rate: f32,
    /// Orbital drift of work anchors once complete, radians per second.
    pub orbit_speed: f32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            intro_duration: 3.0,
            text_size: 64.0,
            text_hold: 2.5,
            text_release: 1.5,
            idle_threshold: 8.0,
            idle_emit_interval: 0.6,
            idle_text_threshold: 25.0,
            idle_text_cooldown: 40.0,
            bloom_threshold: 4_000.0,
            bloom_size: 24,
            tour_dwell: 5.0,
            pulse_interval: 6.0,
            wind_rate: 4.0,
            orbit_speed: 0.02,
        }
    }
}

/// Everything needed to run one organism session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    pub physics: PhysicsConfig,
    pub effects: EffectsConfig,
    pub discovery: DiscoveryConfig,
    pub audio: AudioConfig,
    pub quality: QualityConfig,
    pub spatial: SpatialConfig,
}

impl OrganismConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason })
        }

        if self.physics.capacity == 0 {
            return invalid("physics.capacity", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.physics.damping) {
            return invalid("physics.damping", "must be within 0..=1");
        }
        if !(self.spatial.cell_size > 0.0) {
            return invalid("spatial.cell_size", "must be positive");
        }
        if !(self.audio.sample_rate >= 1_000.0) {
            return invalid("audio.sample_rate", "must be at least 1000 Hz");
        }
        if self.quality.window == 0 {
            return invalid("quality.window", "must be at least 1");
        }
        if !(self.discovery.pointer_dwell > 0.0 && self.discovery.touch_dwell > 0.0) {
            return invalid("discovery.dwell", "thresholds must be positive");
        }
        if !(self.discovery.shockwave_life > 0.0) {
            return invalid("discovery.shockwave_life", "must be positive");
        }
        if !(self.effects.text_release > 0.0) {
            return invalid("effects.text_release", "must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = OrganismConfig::from_json(r#"{ "physics": { "damping": 0.9 } }"#).unwrap();
        assert_eq!(config.physics.damping, 0.9);
        assert_eq!(config.physics.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let config = OrganismConfig::default();
        let back = OrganismConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = OrganismConfig::from_json(r#"{ "spatial": { "cell_size": 0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "spatial.cell_size",
                ..
            }
        ));
        assert!(matches!(
            OrganismConfig::from_json("[1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_lifetimes_rejected() {
        let err = OrganismConfig::from_json(r#"{ "discovery": { "shockwave_life": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "discovery.shockwave_life",
                ..
            }
        ));

        let mut config = OrganismConfig::default();
        config.effects.text_release = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "effects.text_release",
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = OrganismConfig::load("/nonexistent/organism.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
