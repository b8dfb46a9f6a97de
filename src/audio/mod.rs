//! Procedural audio engine.
//!
//! Everything is synthesized in-process and pulled by the host through
//! [`AudioEngine::render`]. The engine never makes sound on its own: it stays
//! silent until [`AudioEngine::enable`] is called, and every call is a no-op
//! while disabled.
//!
//! The voice graph:
//!
//! ```text
//! drone triad + overtones ─┐
//! plucks ──────────────────┼─> reverb ─> master gain ─> soft clip ─> out
//! noise bed ───────────────┘
//! ```
//!
//! Disabling releases the drones instead of cutting them: `render` keeps
//! producing the fade-out tail until the last drone has finished, then the
//! context suspends.
//!
//! Melodies are not played through timers. Each note is queued in a
//! [`Scheduler`] against the engine clock and started from `update`, so
//! `destroy` only has to clear the queue.

mod mood;
mod reverb;
mod voice;

pub use mood::{midi_to_hz, Mood, MoodParams, Scale};
pub use reverb::Reverb;
pub use voice::{DroneVoice, Lfo, NoiseBed, Pluck, KS_DECAY};

use crate::time::Scheduler;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maximum number of drone overtones unlocked by blooms.
pub const MAX_OVERTONES: u32 = 4;

/// Audio engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: f32,
    pub master_gain: f32,
    pub drone_level: f32,
    pub pluck_level: f32,
    pub noise_level: f32,
    /// MIDI note of the drone tonic.
    pub root_midi: i32,
    /// Seconds between chord changes.
    pub chord_interval: f32,
    /// Seconds a chord change takes to glide in.
    pub chord_glide: f32,
    /// Oldest plucks are cut beyond this many.
    pub max_plucks: usize,
    /// Chance the last melody note gets a harmony pluck; earlier notes
    /// scale down linearly.
    pub harmony_probability: f32,
    /// Fraction of the way mood parameters move toward the target per update.
    pub param_rate: f32,
    /// Length of the generated reverb tail in seconds.
    pub reverb_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            master_gain: 0.5,
            drone_level: 0.06,
            pluck_level: 0.35,
            noise_level: 0.012,
            root_midi: 48,
            chord_interval: 24.0,
            chord_glide: 6.0,
            max_plucks: 24,
            harmony_probability: 0.6,
            param_rate: 0.02,
            reverb_secs: 3.0,
        }
    }
}

/// Lifecycle of the synthesis context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing sound (initial state).
    Suspended,
    Running,
    /// Torn down; cannot be resumed.
    Closed,
}

/// Owner of the sample clock.
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: f32,
    state: ContextState,
    frames_rendered: u64,
}

impl AudioContext {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            state: ContextState::Suspended,
            frames_rendered: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Start producing sound. Fails once closed.
    pub fn resume(&mut self) -> bool {
        match self.state {
            ContextState::Closed => false,
            _ => {
                self.state = ContextState::Running;
                true
            }
        }
    }

    pub fn suspend(&mut self) {
        if self.state == ContextState::Running {
            self.state = ContextState::Suspended;
        }
    }

    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    fn advance(&mut self, frames: usize) {
        self.frames_rendered += frames as u64;
    }
}

/// A single queued or immediate pluck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluckRequest {
    pub frequency: f32,
    /// `0.0..=1.0`.
    pub velocity: f32,
    /// Ring-out in seconds.
    pub duration: f32,
}

/// Drone, plucks, noise bed and reverb behind an enable gate.
pub struct AudioEngine {
    config: AudioConfig,
    context: AudioContext,
    enabled: bool,
    mood: Mood,
    params: MoodParams,
    target: MoodParams,
    scale: Scale,
    generation: u32,
    /// Circadian note density in `0..=1`; scales harmony notes.
    note_density: f32,
    chord_index: usize,
    chord_timer: f32,
    drones: Vec<DroneVoice>,
    plucks: Vec<Pluck>,
    pending: Scheduler<PluckRequest>,
    noise: NoiseBed,
    reverb: Reverb,
    rng: SmallRng,
    /// Engine clock in seconds, advanced by `update`.
    clock: f32,
    last_melody: Vec<i32>,
}

impl AudioEngine {
    pub fn new(config: AudioConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let reverb = Reverb::generate(&mut rng, config.sample_rate, config.reverb_secs);
        let noise = NoiseBed::new(&mut rng, config.noise_level);
        let params = Mood::default().params();
        Self {
            context: AudioContext::new(config.sample_rate),
            config,
            enabled: false,
            mood: Mood::default(),
            params,
            target: params,
            scale: Scale::default(),
            generation: 0,
            note_density: 1.0,
            chord_index: 0,
            chord_timer: 0.0,
            drones: Vec::new(),
            plucks: Vec::new(),
            pending: Scheduler::new(),
            noise,
            reverb,
            rng,
            clock: 0.0,
            last_melody: Vec::new(),
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Start sound. Returns `false` if the engine was destroyed.
    pub fn enable(&mut self) -> bool {
        if !self.context.resume() {
            return false;
        }
        if !self.enabled {
            self.enabled = true;
            if self.drones.is_empty() {
                self.build_drones();
            } else {
                self.drones.iter_mut().for_each(DroneVoice::sustain);
            }
            info!(mood = ?self.mood, "audio enabled");
        }
        true
    }

    /// Stop accepting notes and fade the drones out. The context suspends
    /// once the tail has been rendered.
    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            self.drones.iter_mut().for_each(DroneVoice::release);
            if self.drones.is_empty() {
                self.context.suspend();
            }
            info!("audio disabled");
        }
    }

    /// Flip the enable gate. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.enabled {
            self.disable();
        } else {
            self.enable();
        }
        self.enabled
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `render` produces sound: enabled, or still fading out.
    #[inline]
    pub fn is_audible(&self) -> bool {
        self.context.state() == ContextState::Running
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Current (smoothed) mood parameters.
    pub fn params(&self) -> &MoodParams {
        &self.params
    }

    /// Set the target mood. Parameters glide toward it on `update`.
    pub fn set_mood(&mut self, mood: Mood) {
        if mood != self.mood {
            debug!(?mood, "mood change");
            self.mood = mood;
            self.target = mood.params();
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Record the bloom generation. Each generation unlocks one drone
    /// overtone, up to [`MAX_OVERTONES`].
    pub fn set_generation(&mut self, generation: u32) {
        self.generation = generation;
        if self.enabled {
            self.sync_overtones();
        }
    }

    pub fn note_density(&self) -> f32 {
        self.note_density
    }

    /// Sparser phases harmonize less often.
    pub fn set_note_density(&mut self, density: f32) {
        self.note_density = density.clamp(0.0, 1.0);
    }

    pub fn chord_index(&self) -> usize {
        self.chord_index
    }

    pub fn drone_voices(&self) -> &[DroneVoice] {
        &self.drones
    }

    pub fn active_plucks(&self) -> usize {
        self.plucks.len()
    }

    /// Plucks queued for later.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Degrees passed to the last accepted `play_melody`.
    pub fn last_melody(&self) -> &[i32] {
        &self.last_melody
    }

    /// Advance the engine clock: blend mood parameters, step the chord
    /// progression and start due plucks.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        self.clock += dt;
        self.params.approach(&self.target, self.config.param_rate);

        self.chord_timer += dt;
        if self.chord_timer >= self.config.chord_interval {
            self.chord_timer -= self.config.chord_interval;
            let len = self.mood.progression().len();
            self.chord_index = (self.chord_index + 1) % len;
            self.retune(self.config.chord_glide);
            debug!(chord = self.chord_index, "chord change");
        }

        for request in self.pending.drain_due(self.clock) {
            self.start_pluck(request);
        }
    }

    /// Start a pluck now.
    pub fn pluck(&mut self, request: PluckRequest) -> bool {
        if !self.enabled {
            return false;
        }
        self.start_pluck(request)
    }

    /// Queue a melody given as scale degrees. Returns how many plucks were
    /// scheduled, harmony notes included.
    pub fn play_melody(&mut self, degrees: &[i32]) -> usize {
        if !self.enabled || degrees.is_empty() {
            return 0;
        }
        self.last_melody = degrees.to_vec();

        let gap = self.params.note_gap;
        let ring = self.params.reverb_decay / 3.0;
        let mut scheduled = 0;
        for (i, &degree) in degrees.iter().enumerate() {
            let jitter = self.rng.gen_range(-0.03..0.03);
            let at = (self.clock + i as f32 * gap + jitter).max(self.clock);
            let velocity = self.rng.gen_range(0.5..0.8);
            let duration = self.rng.gen_range(1.2..2.0) * ring;
            let frequency = self.melody_hz(degree);
            self.pending.schedule(
                at,
                PluckRequest {
                    frequency,
                    velocity,
                    duration,
                },
            );
            scheduled += 1;

            // Harmony grows more likely toward the end of the phrase
            let chance = self.config.harmony_probability * self.note_density * (i + 1) as f32
                / degrees.len() as f32;
            if self.rng.gen::<f32>() < chance {
                // A third or a fifth above, in scale steps
                let step = if self.rng.gen_bool(0.5) { 2 } else { 4 };
                let offset = self.rng.gen_range(0.04..0.09);
                self.pending.schedule(
                    at + offset,
                    PluckRequest {
                        frequency: self.melody_hz(degree + step),
                        velocity: velocity * 0.5,
                        duration: duration * 0.8,
                    },
                );
                scheduled += 1;
            }
        }
        debug!(notes = degrees.len(), scheduled, "melody queued");
        scheduled
    }

    /// Fill `out` with mono samples. Writes silence unless the context is
    /// running (enabled, or fading out after `disable`).
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.is_audible() {
            out.iter_mut().for_each(|s| *s = 0.0);
            return;
        }

        let sr = self.config.sample_rate;
        let brightness = self.params.brightness;
        let tremolo = self.params.tremolo;
        for sample in out.iter_mut() {
            let mut dry = 0.0;
            for drone in &mut self.drones {
                dry += drone.next_sample(sr, brightness, tremolo);
            }
            let mut strings = 0.0;
            for pluck in &mut self.plucks {
                strings += pluck.next_sample();
            }
            dry += strings * self.config.pluck_level;
            dry += self.noise.next_sample(&mut self.rng, sr);

            let wet = self.reverb.process(dry);
            *sample = (wet * self.config.master_gain).tanh();
        }

        self.context.advance(out.len());
        self.plucks.retain(|p| !p.is_finished());
        self.drones.retain(|d| !d.is_finished());
        if !self.enabled && self.drones.is_empty() {
            self.context.suspend();
        }
    }

    /// Stop every voice, drop queued notes and close the context for good.
    pub fn destroy(&mut self) {
        self.enabled = false;
        self.plucks.clear();
        self.drones.clear();
        self.pending.clear();
        self.reverb.clear();
        self.context.close();
        info!("audio destroyed");
    }

    fn start_pluck(&mut self, request: PluckRequest) -> bool {
        let pluck = Pluck::new(
            &mut self.rng,
            self.config.sample_rate,
            request.frequency,
            request.velocity,
            request.duration,
            self.params.brightness,
        );
        let Some(pluck) = pluck else {
            return false;
        };
        if self.plucks.len() >= self.config.max_plucks {
            self.plucks.remove(0);
        }
        self.plucks.push(pluck);
        true
    }

    fn melody_hz(&self, degree: i32) -> f32 {
        let semis = self.scale.degree_to_semitone(degree);
        midi_to_hz((self.config.root_midi + 12 + semis) as f32 + self.params.pitch_offset)
    }

    /// Triad of the current chord: root an octave down, then the upper tones.
    fn chord_hz(&self) -> [f32; 3] {
        let progression = self.mood.progression();
        let chord = progression[self.chord_index % progression.len()];
        let mut out = [0.0; 3];
        for (k, &degree) in chord.iter().enumerate() {
            let drop = if k == 0 { 12 } else { 0 };
            let semis = self.scale.degree_to_semitone(degree) - drop;
            out[k] = midi_to_hz((self.config.root_midi + semis) as f32 + self.params.pitch_offset);
        }
        out
    }

    /// Target frequency of drone voice `i`: the triad, then harmonics 2..=5
    /// of the chord root.
    fn drone_target(&self, i: usize) -> f32 {
        let triad = self.chord_hz();
        match i {
            0..=2 => triad[i],
            _ => triad[0] * (i as f32 - 1.0),
        }
    }

    fn build_drones(&mut self) {
        for i in 0..3 {
            let freq = self.drone_target(i);
            let level = if i == 0 {
                self.config.drone_level
            } else {
                self.config.drone_level * 0.6
            };
            let voice = DroneVoice::new(&mut self.rng, freq, level);
            self.drones.push(voice);
        }
        self.sync_overtones();
    }

    fn sync_overtones(&mut self) {
        let wanted = 3 + self.generation.min(MAX_OVERTONES) as usize;
        while self.drones.len() < wanted {
            let i = self.drones.len();
            let harmonic = i as f32 - 1.0;
            let freq = self.drone_target(i);
            let voice = DroneVoice::new(&mut self.rng, freq, self.config.drone_level / harmonic);
            self.drones.push(voice);
        }
    }

    fn retune(&mut self, glide: f32) {
        let targets: Vec<f32> = (0..self.drones.len()).map(|i| self.drone_target(i)).collect();
        for (voice, freq) in self.drones.iter_mut().zip(targets) {
            voice.glide_to(freq, glide);
        }
    }
}
