//! One-way adaptive quality.
//!
//! Frame durations go into a fixed circular window. Once the window is full,
//! an average above the threshold triggers a single downgrade for the rest of
//! the session: a smaller particle cap and sprite glows instead of per-particle
//! gradients. There is no upgrade path.

use crate::visuals::GlowMode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Frames in the averaging window.
    pub window: usize,
    /// Average frame time that triggers the downgrade, in milliseconds.
    pub threshold_ms: f32,
    /// Particle cap multiplier applied on downgrade.
    pub capacity_factor: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            window: 60,
            threshold_ms: 25.0,
            capacity_factor: 0.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveQuality {
    config: QualityConfig,
    samples: Vec<f32>,
    cursor: usize,
    filled: bool,
    degraded: bool,
}

impl AdaptiveQuality {
    pub fn new(config: QualityConfig) -> Self {
        let window = config.window.max(1);
        Self {
            config,
            samples: vec![0.0; window],
            cursor: 0,
            filled: false,
            degraded: false,
        }
    }

    /// Record one frame duration. Returns `true` exactly once, on the frame
    /// the downgrade happens.
    pub fn record(&mut self, frame_ms: f32) -> bool {
        if self.degraded || !frame_ms.is_finite() {
            return false;
        }
        self.samples[self.cursor] = frame_ms;
        self.cursor = (self.cursor + 1) % self.samples.len();
        if self.cursor == 0 {
            self.filled = true;
        }
        if !self.filled {
            return false;
        }

        let average = self.average();
        if average > self.config.threshold_ms {
            self.degraded = true;
            warn!(average_ms = average, "frame budget exceeded, reducing quality");
            return true;
        }
        false
    }

    pub fn average(&self) -> f32 {
        let n = if self.filled {
            self.samples.len()
        } else {
            self.cursor.max(1)
        };
        self.samples[..n].iter().sum::<f32>() / n as f32
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn glow_mode(&self) -> GlowMode {
        if self.degraded {
            GlowMode::Sprite
        } else {
            GlowMode::Gradient
        }
    }

    /// Particle cap to use given the configured full-quality cap.
    pub fn capacity(&self, full: usize) -> usize {
        if self.degraded {
            (full as f32 * self.config.capacity_factor).floor() as usize
        } else {
            full
        }
    }
}

impl Default for AdaptiveQuality {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}
