//! Synthesis voices: drones, Karplus-Strong plucks and the noise bed.

use rand::Rng;
use std::f32::consts::TAU;

/// Karplus-Strong loss applied to the sum of two adjacent delayed samples.
pub const KS_DECAY: f32 = 0.498;

/// Sine low-frequency oscillator.
#[derive(Debug, Clone, Copy)]
pub struct Lfo {
    phase: f32,
    rate_hz: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, phase: f32) -> Self {
        Self {
            phase: phase.rem_euclid(TAU),
            rate_hz,
        }
    }

    /// Random phase and a rate drawn from `rates`.
    pub fn random<R: Rng>(rng: &mut R, rates: std::ops::Range<f32>) -> Self {
        Self::new(rng.gen_range(rates), rng.gen_range(0.0..TAU))
    }

    pub fn rate(&self) -> f32 {
        self.rate_hz
    }

    /// Current value in `-1.0..=1.0`.
    #[inline]
    pub fn value(&self) -> f32 {
        self.phase.sin()
    }

    #[inline]
    pub fn advance(&mut self, dt: f32) {
        self.phase = (self.phase + TAU * self.rate_hz * dt).rem_euclid(TAU);
    }
}

/// One sustained drone partial.
#[derive(Debug, Clone)]
pub struct DroneVoice {
    /// Frequency the voice is gliding toward.
    target_hz: f32,
    current_hz: f32,
    /// Hz per second the glide may cover.
    glide_rate: f32,
    level: f32,
    amp_lfo: Lfo,
    drift_lfo: Lfo,
    /// Drift depth in cents.
    drift_cents: f32,
    phase: f32,
    /// Fade-in/out gain in `0..=1`.
    gate: f32,
    releasing: bool,
}

impl DroneVoice {
    pub fn new<R: Rng>(rng: &mut R, freq_hz: f32, level: f32) -> Self {
        Self {
            target_hz: freq_hz,
            current_hz: freq_hz,
            glide_rate: 0.0,
            level,
            amp_lfo: Lfo::random(rng, 0.04..0.16),
            drift_lfo: Lfo::random(rng, 0.01..0.04),
            drift_cents: rng.gen_range(2.0..6.0),
            phase: rng.gen_range(0.0..TAU),
            gate: 0.0,
            releasing: false,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.current_hz
    }

    pub fn target_frequency(&self) -> f32 {
        self.target_hz
    }

    pub fn amp_lfo(&self) -> &Lfo {
        &self.amp_lfo
    }

    /// Slide toward `freq_hz` over `seconds`.
    pub fn glide_to(&mut self, freq_hz: f32, seconds: f32) {
        self.target_hz = freq_hz;
        self.glide_rate = (freq_hz - self.current_hz).abs() / seconds.max(0.01);
    }

    /// Begin fading out. The voice is finished once the gate reaches zero.
    pub fn release(&mut self) {
        self.releasing = true;
    }

    /// Cancel a release; the gate ramps back up.
    pub fn sustain(&mut self) {
        self.releasing = false;
    }

    pub fn is_releasing(&self) -> bool {
        self.releasing
    }

    pub fn is_finished(&self) -> bool {
        self.releasing && self.gate <= 0.0
    }

    /// Render one sample.
    pub fn next_sample(&mut self, sample_rate: f32, brightness: f32, tremolo: f32) -> f32 {
        let dt = 1.0 / sample_rate;

        let gate_step = dt / 2.5;
        self.gate = if self.releasing {
            (self.gate - gate_step).max(0.0)
        } else {
            (self.gate + gate_step).min(1.0)
        };

        if self.current_hz != self.target_hz {
            let step = self.glide_rate * dt;
            let delta = self.target_hz - self.current_hz;
            self.current_hz = if delta.abs() <= step {
                self.target_hz
            } else {
                self.current_hz + step * delta.signum()
            };
        }

        self.amp_lfo.advance(dt);
        self.drift_lfo.advance(dt);

        let cents = self.drift_lfo.value() * self.drift_cents;
        let freq = self.current_hz * 2f32.powf(cents / 1200.0);
        self.phase = (self.phase + TAU * freq * dt).rem_euclid(TAU);

        let body = self.phase.sin() + (2.0 * self.phase).sin() * 0.25 * brightness;
        let breathe = 1.0 - tremolo * (0.5 + 0.5 * self.amp_lfo.value());
        body * self.level * breathe * self.gate
    }
}

/// A plucked string rendered with the Karplus-Strong algorithm.
///
/// The delay line is seeded with noise; every output sample replaces itself
/// with `KS_DECAY * (y[n - N] + y[n - N + 1])`, which low-passes and decays
/// the loop into a plucked tone of period `N = sample_rate / frequency`.
#[derive(Debug, Clone)]
pub struct Pluck {
    line: Vec<f32>,
    cursor: usize,
    velocity: f32,
    elapsed: usize,
    length: usize,
}

impl Pluck {
    /// Build a pluck. Returns `None` for frequencies that cannot form a
    /// delay line of at least two samples.
    pub fn new<R: Rng>(
        rng: &mut R,
        sample_rate: f32,
        frequency: f32,
        velocity: f32,
        duration: f32,
        brightness: f32,
    ) -> Option<Self> {
        if !(frequency > 0.0) || !frequency.is_finite() {
            return None;
        }
        let period = (sample_rate / frequency).round() as usize;
        if period < 2 {
            return None;
        }

        let mut line = Vec::with_capacity(period);
        let mut last = 0.0f32;
        // Dark moods smear the excitation toward the previous seed sample
        let smoothing = if brightness < 0.5 {
            0.25 + brightness
        } else {
            1.0
        };
        for _ in 0..period {
            let noise = rng.gen_range(-1.0f32..1.0);
            last += (noise - last) * smoothing;
            line.push(last);
        }

        Some(Self {
            line,
            cursor: 0,
            velocity: velocity.clamp(0.0, 1.0),
            elapsed: 0,
            length: (duration.max(0.05) * sample_rate) as usize,
        })
    }

    pub fn period(&self) -> usize {
        self.line.len()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.length
    }

    /// Render one sample; silent once finished.
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let n = self.line.len();
        let out = self.line[self.cursor];
        let next = self.line[(self.cursor + 1) % n];
        self.line[self.cursor] = KS_DECAY * (out + next);
        self.cursor = (self.cursor + 1) % n;
        self.elapsed += 1;

        // Short fade at the end so a cut never clicks
        let remaining = self.length - self.elapsed;
        let tail = (remaining as f32 / (self.length as f32 * 0.1).max(1.0)).min(1.0);
        out * self.velocity * tail
    }
}

/// Brown noise through a slowly swept one-pole low-pass.
#[derive(Debug, Clone)]
pub struct NoiseBed {
    brown: f32,
    filtered: f32,
    sweep: Lfo,
    swell: Lfo,
    level: f32,
}

impl NoiseBed {
    pub fn new<R: Rng>(rng: &mut R, level: f32) -> Self {
        Self {
            brown: 0.0,
            filtered: 0.0,
            sweep: Lfo::random(rng, 0.02..0.05),
            swell: Lfo::random(rng, 0.05..0.1),
            level,
        }
    }

    pub fn next_sample<R: Rng>(&mut self, rng: &mut R, sample_rate: f32) -> f32 {
        let dt = 1.0 / sample_rate;
        self.sweep.advance(dt);
        self.swell.advance(dt);

        let white = rng.gen_range(-1.0f32..1.0);
        self.brown = ((self.brown + white * 0.02) * 0.998).clamp(-1.0, 1.0);

        let cutoff_hz = 300.0 + 500.0 * (0.5 + 0.5 * self.sweep.value());
        let alpha = 1.0 - (-TAU * cutoff_hz * dt).exp();
        self.filtered += (self.brown - self.filtered) * alpha;

        self.filtered * self.level * (0.6 + 0.4 * self.swell.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
    }

    #[test]
    fn test_pluck_period_matches_frequency() {
        let mut rng = SmallRng::seed_from_u64(1);
        let pluck = Pluck::new(&mut rng, 44_100.0, 441.0, 1.0, 1.0, 0.8).unwrap();
        assert_eq!(pluck.period(), 100);
    }

    #[test]
    fn test_pluck_decays_and_finishes() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut pluck = Pluck::new(&mut rng, 8_000.0, 200.0, 1.0, 1.0, 0.8).unwrap();
        let samples: Vec<f32> = (0..8_000).map(|_| pluck.next_sample()).collect();
        assert!(pluck.is_finished());
        let early = energy(&samples[..1_000]);
        let late = energy(&samples[6_000..7_000]);
        assert!(late < early * 0.5, "early {early} late {late}");
        assert_eq!(pluck.next_sample(), 0.0);
    }

    #[test]
    fn test_dark_pluck_is_smoother() {
        let roughness = |brightness: f32| {
            let mut rng = SmallRng::seed_from_u64(3);
            let mut p = Pluck::new(&mut rng, 8_000.0, 100.0, 1.0, 0.5, brightness).unwrap();
            let s: Vec<f32> = (0..80).map(|_| p.next_sample()).collect();
            s.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>()
        };
        assert!(roughness(0.1) < roughness(0.9));
    }

    #[test]
    fn test_invalid_pluck_frequency() {
        let mut rng = SmallRng::seed_from_u64(4);
        assert!(Pluck::new(&mut rng, 44_100.0, 0.0, 1.0, 1.0, 0.5).is_none());
        assert!(Pluck::new(&mut rng, 44_100.0, 40_000.0, 1.0, 1.0, 0.5).is_none());
        assert!(Pluck::new(&mut rng, 44_100.0, f32::NAN, 1.0, 1.0, 0.5).is_none());
    }

    #[test]
    fn test_drone_glides_to_target() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut voice = DroneVoice::new(&mut rng, 110.0, 0.1);
        voice.glide_to(220.0, 0.5);
        for _ in 0..4_200 {
            voice.next_sample(8_000.0, 0.5, 0.3);
        }
        assert_eq!(voice.frequency(), 220.0);
    }

    #[test]
    fn test_drone_lfos_differ_per_voice() {
        let mut rng = SmallRng::seed_from_u64(6);
        let a = DroneVoice::new(&mut rng, 110.0, 0.1);
        let b = DroneVoice::new(&mut rng, 110.0, 0.1);
        assert_ne!(a.amp_lfo().rate(), b.amp_lfo().rate());
    }

    #[test]
    fn test_released_drone_finishes() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut voice = DroneVoice::new(&mut rng, 110.0, 0.1);
        for _ in 0..1_000 {
            voice.next_sample(1_000.0, 0.5, 0.3);
        }
        voice.release();
        for _ in 0..3_000 {
            voice.next_sample(1_000.0, 0.5, 0.3);
        }
        assert!(voice.is_finished());
    }
}
