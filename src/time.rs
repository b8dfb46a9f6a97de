//! Frame clock and the timestamp scheduler.
//!
//! [`Time`] measures real frame deltas for the viewer and caps them so a
//! stalled tab or a debugger pause never hands the physics a huge step.
//! [`Scheduler`] replaces fire-and-forget timers: work is queued against the
//! organism's own clock and drained inside `update`, so stopping the organism
//! simply clears the queue.
//!
//! # Example
//!
//! ```ignore
//! use organism::time::{Scheduler, Time};
//!
//! let mut time = Time::new();
//! let mut later = Scheduler::new();
//! later.schedule(0.5, "pulse");
//!
//! // In your frame loop:
//! let dt = time.update();
//! for action in later.drain_due(time.elapsed()) {
//!     println!("{action} at {:.2}s", time.elapsed());
//! }
//! ```

use std::time::{Duration, Instant};

/// Largest delta handed to the simulation, in seconds.
pub const MAX_DELTA: f32 = 0.05;

/// Wall clock for the frame loop.
#[derive(Debug)]
pub struct Time {
    last: Instant,
    elapsed: f32,
    delta: f32,
    /// Uncapped duration of the last frame in milliseconds.
    raw_ms: f32,
    frames: u64,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            delta: 0.0,
            raw_ms: 0.0,
            frames: 0,
        }
    }

    /// Advance one frame and return the capped delta in seconds.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.saturating_duration_since(self.last);
        self.last = now;
        self.tick(raw)
    }

    fn tick(&mut self, raw: Duration) -> f32 {
        self.raw_ms = raw.as_secs_f32() * 1000.0;
        self.delta = cap_delta(raw.as_secs_f32());
        self.elapsed += self.delta;
        self.frames += 1;
        self.delta
    }

    /// Simulated seconds since start (sum of capped deltas).
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Real duration of the last frame in milliseconds, before capping.
    #[inline]
    pub fn frame_ms(&self) -> f32 {
        self.raw_ms
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frames
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a frame delta to `0..=MAX_DELTA`. Non-finite input becomes 0.
#[inline]
pub fn cap_delta(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_DELTA)
    } else {
        0.0
    }
}

/// Deferred actions keyed by the time they become due.
///
/// Entries due at the same instant drain in insertion order.
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    entries: Vec<(f32, u64, A)>,
    next_seq: u64,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Queue `action` to fire once the clock reaches `at`.
    pub fn schedule(&mut self, at: f32, action: A) {
        self.entries.push((at, self.next_seq, action));
        self.next_seq += 1;
    }

    /// Remove and return every action due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f32) -> Vec<A> {
        if self.entries.iter().all(|e| e.0 > now) {
            return Vec::new();
        }
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.0 <= now);
        self.entries = pending;
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, action)| action).collect()
    }

    /// Time of the earliest pending action.
    pub fn next_due(&self) -> Option<f32> {
        self.entries.iter().map(|e| e.0).min_by(f32::total_cmp)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
