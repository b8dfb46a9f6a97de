//! Time-of-day palette, physics tuning and musical mood.
//!
//! A [`CircadianProfile`] is a pure function of the fractional hour. The day
//! is split into four phases; during the last 30% of a phase every numeric
//! field crossfades toward the next phase so boundaries never jump. Hues
//! blend along the shortest arc. The scale and mood tags switch halfway
//! through the crossfade.
//!
//! [`CircadianClock`] recomputes the profile on a coarse cadence since the
//! drift is imperceptible frame to frame.

use crate::audio::{Mood, Scale};
use crate::visuals::{lerp, Hsl, Rgb};
use chrono::{Local, Timelike};

/// Seconds between profile recomputes.
pub const REFRESH_INTERVAL: f32 = 60.0;

/// Fraction of a phase after which blending toward the next one begins.
const BLEND_START: f32 = 0.7;

/// Named part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Night,
    Dawn,
    Day,
    Dusk,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Night, Phase::Dawn, Phase::Day, Phase::Dusk];

    /// `[start, end)` in hours. Night wraps past midnight.
    pub fn range(self) -> (f32, f32) {
        match self {
            Phase::Night => (21.0, 5.0),
            Phase::Dawn => (5.0, 8.0),
            Phase::Day => (8.0, 17.0),
            Phase::Dusk => (17.0, 21.0),
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Night => Phase::Dawn,
            Phase::Dawn => Phase::Day,
            Phase::Day => Phase::Dusk,
            Phase::Dusk => Phase::Night,
        }
    }

    fn duration(self) -> f32 {
        let (start, end) = self.range();
        (end - start).rem_euclid(24.0)
    }

    /// Phase containing `hour` and how far into it we are (`0.0..1.0`).
    pub fn locate(hour: f32) -> (Phase, f32) {
        let hour = hour.rem_euclid(24.0);
        for phase in Phase::ALL {
            let (start, _) = phase.range();
            let into = (hour - start).rem_euclid(24.0);
            if into < phase.duration() {
                return (phase, into / phase.duration());
            }
        }
        (Phase::Night, 0.0)
    }

    /// The unblended profile at the heart of this phase.
    pub fn profile(self) -> CircadianProfile {
        match self {
            Phase::Night => CircadianProfile {
                phase: Phase::Night,
                background: Rgb::from_u8(6, 8, 20),
                primary: Hsl::new(225.0, 60.0, 65.0),
                secondary: Hsl::new(265.0, 45.0, 55.0),
                accent: Hsl::new(190.0, 80.0, 70.0),
                speed: 0.6,
                breathing_rate: 0.25,
                trail_length: 10.0,
                glow: 1.0,
                note_density: 0.5,
                scale: Scale::Minor,
                mood: Mood::Contemplative,
                blend: 0.0,
            },
            Phase::Dawn => CircadianProfile {
                phase: Phase::Dawn,
                background: Rgb::from_u8(28, 20, 34),
                primary: Hsl::new(20.0, 75.0, 68.0),
                secondary: Hsl::new(330.0, 55.0, 62.0),
                accent: Hsl::new(45.0, 90.0, 72.0),
                speed: 0.85,
                breathing_rate: 0.35,
                trail_length: 6.0,
                glow: 0.8,
                note_density: 0.7,
                scale: Scale::Lydian,
                mood: Mood::Ambient,
                blend: 0.0,
            },
            Phase::Day => CircadianProfile {
                phase: Phase::Day,
                background: Rgb::from_u8(14, 20, 30),
                primary: Hsl::new(195.0, 70.0, 66.0),
                secondary: Hsl::new(160.0, 55.0, 58.0),
                accent: Hsl::new(50.0, 85.0, 65.0),
                speed: 1.0,
                breathing_rate: 0.45,
                trail_length: 4.0,
                glow: 0.6,
                note_density: 1.0,
                scale: Scale::Major,
                mood: Mood::Rhythmic,
                blend: 0.0,
            },
            Phase::Dusk => CircadianProfile {
                phase: Phase::Dusk,
                background: Rgb::from_u8(24, 12, 22),
                primary: Hsl::new(300.0, 50.0, 62.0),
                secondary: Hsl::new(15.0, 70.0, 60.0),
                accent: Hsl::new(275.0, 65.0, 70.0),
                speed: 0.75,
                breathing_rate: 0.3,
                trail_length: 8.0,
                glow: 0.9,
                note_density: 0.6,
                scale: Scale::Dorian,
                mood: Mood::Melancholic,
                blend: 0.0,
            },
        }
    }
}

/// Snapshot of the time-of-day parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircadianProfile {
    /// Phase containing the hour.
    pub phase: Phase,
    pub background: Rgb,
    pub primary: Hsl,
    pub secondary: Hsl,
    pub accent: Hsl,
    /// Multiplier on cohesion and drift.
    pub speed: f32,
    /// Breathing oscillation in Hz.
    pub breathing_rate: f32,
    /// Trail samples kept per particle.
    pub trail_length: f32,
    /// Glow intensity in `0.0..=1.0`.
    pub glow: f32,
    /// Probability scale for ambient notes.
    pub note_density: f32,
    pub scale: Scale,
    pub mood: Mood,
    /// Weight of the blend toward the next phase (`0.0` outside crossfades).
    pub blend: f32,
}

impl CircadianProfile {
    /// Profile for a fractional hour in `0.0..24.0` (wrapped otherwise).
    pub fn at_hour(hour: f32) -> Self {
        let (phase, fraction) = Phase::locate(hour);
        let current = phase.profile();
        if fraction <= BLEND_START {
            return current;
        }
        let t = ((fraction - BLEND_START) / (1.0 - BLEND_START)).clamp(0.0, 1.0);
        current.blend_toward(&phase.next().profile(), t)
    }

    /// Profile for a wall-clock time.
    pub fn at<T: Timelike>(time: &T) -> Self {
        Self::at_hour(fractional_hour(time))
    }

    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    fn blend_toward(&self, next: &CircadianProfile, t: f32) -> Self {
        let (scale, mood) = if t > 0.5 {
            (next.scale, next.mood)
        } else {
            (self.scale, self.mood)
        };
        Self {
            phase: self.phase,
            background: self.background.lerp(next.background, t),
            primary: self.primary.lerp(next.primary, t),
            secondary: self.secondary.lerp(next.secondary, t),
            accent: self.accent.lerp(next.accent, t),
            speed: lerp(self.speed, next.speed, t),
            breathing_rate: lerp(self.breathing_rate, next.breathing_rate, t),
            trail_length: lerp(self.trail_length, next.trail_length, t),
            glow: lerp(self.glow, next.glow, t),
            note_density: lerp(self.note_density, next.note_density, t),
            scale,
            mood,
            blend: t,
        }
    }

    /// Trail length rounded to whole samples.
    pub fn trail_samples(&self) -> usize {
        self.trail_length.round().max(0.0) as usize
    }
}

/// Hours since midnight including minutes and seconds.
pub fn fractional_hour<T: Timelike>(time: &T) -> f32 {
    time.hour() as f32 + time.minute() as f32 / 60.0 + time.second() as f32 / 3600.0
}

/// Holds the current profile and refreshes it on a fixed cadence.
#[derive(Debug, Clone)]
pub struct CircadianClock {
    profile: CircadianProfile,
    since_refresh: f32,
    interval: f32,
    /// Fixed hour used instead of the wall clock.
    override_hour: Option<f32>,
}

impl CircadianClock {
    /// Clock following local wall time.
    pub fn new() -> Self {
        Self {
            profile: CircadianProfile::now(),
            since_refresh: 0.0,
            interval: REFRESH_INTERVAL,
            override_hour: None,
        }
    }

    /// Clock pinned to `hour`, for tests and demos.
    pub fn fixed(hour: f32) -> Self {
        Self {
            profile: CircadianProfile::at_hour(hour),
            since_refresh: 0.0,
            interval: REFRESH_INTERVAL,
            override_hour: Some(hour),
        }
    }

    pub fn profile(&self) -> &CircadianProfile {
        &self.profile
    }

    pub fn set_hour(&mut self, hour: Option<f32>) {
        self.override_hour = hour;
        self.refresh();
    }

    /// Advance by `dt` seconds. Returns `true` when the profile was recomputed.
    pub fn update(&mut self, dt: f32) -> bool {
        self.since_refresh += dt;
        if self.since_refresh < self.interval {
            return false;
        }
        self.since_refresh = 0.0;
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        self.profile = match self.override_hour {
            Some(hour) => CircadianProfile::at_hour(hour),
            None => CircadianProfile::now(),
        };
    }
}

impl Default for CircadianClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_locate_wraps_midnight() {
        assert_eq!(Phase::locate(23.0).0, Phase::Night);
        assert_eq!(Phase::locate(2.0).0, Phase::Night);
        assert_eq!(Phase::locate(5.0).0, Phase::Dawn);
        assert_eq!(Phase::locate(12.0).0, Phase::Day);
        assert_eq!(Phase::locate(20.99).0, Phase::Dusk);
        let (_, f) = Phase::locate(1.0);
        assert!((f - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_no_blend_early_in_phase() {
        let p = CircadianProfile::at_hour(9.0);
        assert_eq!(p.blend, 0.0);
        assert_eq!(p, Phase::Day.profile());
    }

    #[test]
    fn test_blend_is_continuous_at_boundary() {
        let before = CircadianProfile::at_hour(16.999);
        let after = CircadianProfile::at_hour(17.0);
        assert!((before.speed - after.speed).abs() < 1e-2);
        assert!((before.primary.h - after.primary.h).abs() < 1.0);
        assert_eq!(after.phase, Phase::Dusk);
    }

    #[test]
    fn test_tags_switch_mid_blend() {
        // Day runs 8..17; blend starts at 14.3, midpoint at 15.65
        assert_eq!(CircadianProfile::at_hour(15.0).mood, Mood::Rhythmic);
        assert_eq!(CircadianProfile::at_hour(16.5).mood, Mood::Melancholic);
        assert_eq!(CircadianProfile::at_hour(16.5).scale, Scale::Dorian);
    }

    #[test]
    fn test_fractional_hour() {
        let t = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        assert!((fractional_hour(&t) - 6.5).abs() < 1e-6);
    }

    #[test]
    fn test_clock_refreshes_on_interval() {
        let mut clock = CircadianClock::fixed(12.0);
        assert!(!clock.update(30.0));
        assert!(clock.update(30.0));
        clock.set_hour(Some(23.0));
        assert_eq!(clock.profile().phase, Phase::Night);
    }
}
