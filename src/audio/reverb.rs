//! Procedural convolution reverb.
//!
//! The impulse response is exponentially decaying, low-passed noise generated
//! once per engine. It is stored sparsely (a few hundred taps spread over the
//! tail) so convolution stays cheap enough for the render callback.

use rand::Rng;

/// Number of taps in the sparse impulse response.
pub const IR_TAPS: usize = 384;
/// Fixed dry level.
pub const DRY_MIX: f32 = 0.8;
/// Fixed wet level.
pub const WET_MIX: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct Reverb {
    /// `(delay in samples, gain)` pairs, sorted by delay.
    taps: Vec<(usize, f32)>,
    history: Vec<f32>,
    write: usize,
}

impl Reverb {
    /// Generate an impulse response `decay_secs` long.
    pub fn generate<R: Rng>(rng: &mut R, sample_rate: f32, decay_secs: f32) -> Self {
        let ir_len = ((sample_rate * decay_secs.max(0.1)) as usize).max(IR_TAPS * 2);
        let spacing = ir_len as f32 / IR_TAPS as f32;

        let mut taps = Vec::with_capacity(IR_TAPS);
        let mut filtered = 0.0f32;
        let mut energy = 0.0f32;
        for k in 0..IR_TAPS {
            let jitter = rng.gen_range(0.0..spacing);
            let delay = ((k as f32 * spacing + jitter) as usize).clamp(1, ir_len - 1);
            let t = delay as f32 / ir_len as f32;

            let noise = rng.gen_range(-1.0f32..1.0);
            filtered += (noise - filtered) * 0.6;
            let gain = filtered * (-6.0 * t).exp();
            energy += gain * gain;
            taps.push((delay, gain));
        }

        let norm = if energy > 0.0 { 1.0 / energy.sqrt() } else { 0.0 };
        for tap in &mut taps {
            tap.1 *= norm;
        }
        taps.sort_by_key(|t| t.0);

        Self {
            taps,
            history: vec![0.0; ir_len],
            write: 0,
        }
    }

    /// Length of the impulse response in samples.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn taps(&self) -> &[(usize, f32)] {
        &self.taps
    }

    /// Mix one input sample with its reverberated tail.
    pub fn process(&mut self, input: f32) -> f32 {
        let n = self.history.len();
        self.history[self.write] = input;

        let mut wet = 0.0;
        for &(delay, gain) in &self.taps {
            let idx = (self.write + n - delay) % n;
            wet += self.history[idx] * gain;
        }

        self.write = (self.write + 1) % n;
        input * DRY_MIX + wet * WET_MIX
    }

    /// Silence the tail.
    pub fn clear(&mut self) {
        self.history.iter_mut().for_each(|s| *s = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_ir_decays() {
        let mut rng = SmallRng::seed_from_u64(11);
        let reverb = Reverb::generate(&mut rng, 8_000.0, 2.0);
        let half = reverb.len() / 2;
        let head: f32 = reverb.taps().iter().filter(|t| t.0 < half).map(|t| t.1 * t.1).sum();
        let tail: f32 = reverb.taps().iter().filter(|t| t.0 >= half).map(|t| t.1 * t.1).sum();
        assert!(tail < head);
    }

    #[test]
    fn test_impulse_produces_tail() {
        let mut rng = SmallRng::seed_from_u64(12);
        let mut reverb = Reverb::generate(&mut rng, 4_000.0, 1.0);
        let first = reverb.process(1.0);
        assert!((first - DRY_MIX).abs() < 1e-6);
        let tail: f32 = (0..4_000).map(|_| reverb.process(0.0).abs()).sum();
        assert!(tail > 0.0);

        reverb.clear();
        let silent: f32 = (0..100).map(|_| reverb.process(0.0).abs()).sum();
        assert_eq!(silent, 0.0);
    }
}
