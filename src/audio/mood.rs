//! Moods, scales and chord progressions.

use serde::{Deserialize, Serialize};

/// Musical mood presets. The circadian profile picks one per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Ambient,
    Contemplative,
    Rhythmic,
    Melancholic,
}

/// Continuous parameters a mood drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodParams {
    /// Transposition in semitones applied to every voice.
    pub pitch_offset: f32,
    /// Tail length in seconds; scales pluck ring-out.
    pub reverb_decay: f32,
    /// Timbre brightness in `0.0..=1.0`.
    pub brightness: f32,
    /// Depth of the drone amplitude LFO in `0.0..=1.0`.
    pub tremolo: f32,
    /// Seconds between melody notes.
    pub note_gap: f32,
}

impl MoodParams {
    /// Move every field a fraction `rate` of the way toward `target`.
    pub fn approach(&mut self, target: &MoodParams, rate: f32) {
        let rate = rate.clamp(0.0, 1.0);
        self.pitch_offset += (target.pitch_offset - self.pitch_offset) * rate;
        self.reverb_decay += (target.reverb_decay - self.reverb_decay) * rate;
        self.brightness += (target.brightness - self.brightness) * rate;
        self.tremolo += (target.tremolo - self.tremolo) * rate;
        self.note_gap += (target.note_gap - self.note_gap) * rate;
    }
}

impl Mood {
    pub fn params(self) -> MoodParams {
        match self {
            Mood::Ambient => MoodParams {
                pitch_offset: 0.0,
                reverb_decay: 3.0,
                brightness: 0.6,
                tremolo: 0.3,
                note_gap: 0.32,
            },
            Mood::Contemplative => MoodParams {
                pitch_offset: -2.0,
                reverb_decay: 4.0,
                brightness: 0.4,
                tremolo: 0.2,
                note_gap: 0.45,
            },
            Mood::Rhythmic => MoodParams {
                pitch_offset: 2.0,
                reverb_decay: 2.0,
                brightness: 0.8,
                tremolo: 0.5,
                note_gap: 0.22,
            },
            Mood::Melancholic => MoodParams {
                pitch_offset: -3.0,
                reverb_decay: 5.0,
                brightness: 0.3,
                tremolo: 0.25,
                note_gap: 0.55,
            },
        }
    }

    /// Chords as scale-degree triads, cycled by the engine.
    pub fn progression(self) -> &'static [[i32; 3]] {
        match self {
            Mood::Ambient => &[[0, 2, 4], [3, 5, 7], [4, 6, 8], [0, 2, 4]],
            Mood::Contemplative => &[[0, 2, 4], [5, 7, 9], [3, 5, 7], [4, 6, 8]],
            Mood::Rhythmic => &[[0, 2, 4], [4, 6, 8], [5, 7, 9], [3, 5, 7]],
            Mood::Melancholic => &[[0, 2, 4], [5, 7, 9], [2, 4, 6], [4, 6, 8]],
        }
    }
}

/// Scales available to melodies and chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Pentatonic,
    Major,
    Dorian,
    Lydian,
    Minor,
}

impl Scale {
    /// Semitone offsets of one octave.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// Semitones above the tonic for a scale degree. Degrees past the end of
    /// the scale wrap into higher octaves; negative degrees go below.
    pub fn degree_to_semitone(self, degree: i32) -> i32 {
        let steps = self.intervals();
        let len = steps.len() as i32;
        let octave = degree.div_euclid(len);
        steps[degree.rem_euclid(len) as usize] + 12 * octave
    }
}

/// Frequency in Hz of a (fractional) MIDI note.
pub fn midi_to_hz(note: f32) -> f32 {
    440.0 * 2f32.powf((note - 69.0) / 12.0)
}
