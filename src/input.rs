//! Input unification.
//!
//! Pointer, touch and device-orientation events arrive in whatever order the
//! host delivers them. [`InputUnifier`] folds them into one continuous
//! [`InputSnapshot`] that the organism reads exactly once per tick: position,
//! smoothed position, velocity, press state, multi-touch segment, pinch,
//! swipe, tilt and idle time.
//!
//! Instantaneous gestures (clicks, swipes, pinch steps) are accumulated
//! between ticks and exposed for a single snapshot.
//!
//! # Usage
//!
//! ```ignore
//! let mut input = InputUnifier::new();
//! input.handle_event(InputEvent::PointerMove { pos: Vec2::new(10.0, 20.0) });
//!
//! let snapshot = input.update(dt);
//! if let Some(pos) = snapshot.position {
//!     // attract particles toward pos
//! }
//! ```

use glam::Vec2;
use std::collections::BTreeMap;

/// Fraction of the gap the smoothed position closes per 60 Hz frame.
const SMOOTHING: f32 = 0.15;
/// Max travel in pixels for a press/release pair to count as a click.
const CLICK_SLOP: f32 = 8.0;
/// Min travel in pixels for a touch to count as a swipe.
const SWIPE_MIN_DISTANCE: f32 = 80.0;
/// Max duration in seconds for a touch to count as a swipe.
const SWIPE_MAX_DURATION: f32 = 0.35;
/// Device tilt in degrees that maps to full strength.
const TILT_RANGE: f32 = 45.0;
/// Pitch at which a handheld device counts as level.
const TILT_REST_BETA: f32 = 45.0;

/// Where the latest input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modality {
    #[default]
    Pointer,
    Touch,
}

/// A raw host event, already in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove { pos: Vec2 },
    PointerDown { pos: Vec2 },
    PointerUp { pos: Vec2 },
    /// The pointer left the surface.
    PointerLeave,
    TouchStart { id: u64, pos: Vec2 },
    TouchMove { id: u64, pos: Vec2 },
    TouchEnd { id: u64 },
    /// Scroll or trackpad zoom; positive zooms in.
    Zoom { delta: f32 },
    /// Device orientation in degrees (`beta` front/back, `gamma` left/right).
    Orientation { beta: f32, gamma: f32 },
}

/// Per-tick view of the unified input.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    /// Latest pointer or primary touch position; `None` when absent.
    pub position: Option<Vec2>,
    /// Exponentially smoothed position.
    pub smoothed: Vec2,
    /// Velocity of the raw position in pixels per second.
    pub velocity: Vec2,
    pub modality: Modality,
    pub pressed: bool,
    pub touches: usize,
    /// Segment between the first two active touches.
    pub touch_segment: Option<(Vec2, Vec2)>,
    /// Multiplicative zoom since the previous tick (`1.0` for none).
    pub pinch: f32,
    /// Swipe completed since the previous tick: direction times speed (px/s).
    pub swipe: Option<Vec2>,
    /// Click or tap completed since the previous tick.
    pub click: Option<Vec2>,
    /// Normalized tilt in `-1.0..=1.0`, when a gyroscope reported.
    pub tilt: Option<Vec2>,
    /// Seconds since the last event.
    pub idle_time: f32,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            position: None,
            smoothed: Vec2::ZERO,
            velocity: Vec2::ZERO,
            modality: Modality::Pointer,
            pressed: false,
            touches: 0,
            touch_segment: None,
            pinch: 1.0,
            swipe: None,
            click: None,
            tilt: None,
            idle_time: 0.0,
        }
    }
}

/// Where a touch started, for swipe and tap detection.
#[derive(Debug, Clone, Copy)]
struct TouchOrigin {
    start: Vec2,
    started_at: f32,
    last: Vec2,
}

/// Folds raw events into [`InputSnapshot`]s.
#[derive(Debug)]
pub struct InputUnifier {
    snapshot: InputSnapshot,
    attached: bool,
    clock: f32,

    pointer: Option<Vec2>,
    press_origin: Option<Vec2>,
    last_sampled: Option<Vec2>,
    modality: Modality,

    touches: BTreeMap<u64, TouchOrigin>,
    pinch_distance: Option<f32>,
    /// A second finger joined this gesture; no tap or swipe until all lift.
    was_multi_touch: bool,

    pinch_accum: f32,
    swipe: Option<Vec2>,
    click: Option<Vec2>,
    tilt: Option<Vec2>,
    active: bool,
}

impl InputUnifier {
    pub fn new() -> Self {
        Self {
            snapshot: InputSnapshot::default(),
            attached: true,
            clock: 0.0,
            pointer: None,
            press_origin: None,
            last_sampled: None,
            modality: Modality::Pointer,
            touches: BTreeMap::new(),
            pinch_distance: None,
            was_multi_touch: false,
            pinch_accum: 1.0,
            swipe: None,
            click: None,
            tilt: None,
            active: false,
        }
    }

    /// The snapshot produced by the last `update`.
    pub fn snapshot(&self) -> &InputSnapshot {
        &self.snapshot
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Drop all state and refuse further events until re-attached.
    pub fn detach(&mut self) {
        *self = Self {
            attached: false,
            ..Self::new()
        };
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Fold one event into the pending state.
    pub fn handle_event(&mut self, event: InputEvent) {
        if !self.attached {
            return;
        }
        self.active = true;

        match event {
            InputEvent::PointerMove { pos } => {
                self.modality = Modality::Pointer;
                self.pointer = Some(pos);
            }
            InputEvent::PointerDown { pos } => {
                self.modality = Modality::Pointer;
                self.pointer = Some(pos);
                self.press_origin = Some(pos);
            }
            InputEvent::PointerUp { pos } => {
                self.pointer = Some(pos);
                if let Some(origin) = self.press_origin.take() {
                    if origin.distance(pos) <= CLICK_SLOP {
                        self.click = Some(pos);
                    }
                }
            }
            InputEvent::PointerLeave => {
                self.pointer = None;
                self.press_origin = None;
            }
            InputEvent::TouchStart { id, pos } => {
                self.modality = Modality::Touch;
                self.touches.insert(
                    id,
                    TouchOrigin {
                        start: pos,
                        started_at: self.clock,
                        last: pos,
                    },
                );
                if self.touches.len() > 1 {
                    self.was_multi_touch = true;
                }
                self.pinch_distance = self.touch_distance();
            }
            InputEvent::TouchMove { id, pos } => {
                self.modality = Modality::Touch;
                if let Some(touch) = self.touches.get_mut(&id) {
                    touch.last = pos;
                }
                if let (Some(before), Some(now)) = (self.pinch_distance, self.touch_distance()) {
                    if before > 0.0 && now > 0.0 {
                        self.pinch_accum *= now / before;
                    }
                    self.pinch_distance = Some(now);
                }
            }
            InputEvent::TouchEnd { id } => {
                if let Some(touch) = self.touches.remove(&id) {
                    if self.touches.is_empty() {
                        if !self.was_multi_touch {
                            self.finish_touch(touch);
                        }
                        self.was_multi_touch = false;
                    }
                }
                self.pinch_distance = self.touch_distance();
            }
            InputEvent::Zoom { delta } => {
                self.pinch_accum *= (1.0 + delta * 0.1).clamp(0.5, 2.0);
            }
            InputEvent::Orientation { beta, gamma } => {
                // Orientation streams continuously and is not user activity
                self.active = false;
                if beta.is_finite() && gamma.is_finite() {
                    self.tilt = Some(Vec2::new(
                        (gamma / TILT_RANGE).clamp(-1.0, 1.0),
                        ((beta - TILT_REST_BETA) / TILT_RANGE).clamp(-1.0, 1.0),
                    ));
                }
            }
        }
    }

    fn finish_touch(&mut self, touch: TouchOrigin) {
        let travel = touch.last - touch.start;
        let duration = (self.clock - touch.started_at).max(1e-3);
        let distance = travel.length();
        if distance >= SWIPE_MIN_DISTANCE && duration <= SWIPE_MAX_DURATION {
            self.swipe = Some(travel / distance * (distance / duration));
        } else if distance <= CLICK_SLOP * 2.0 {
            self.click = Some(touch.last);
        }
    }

    fn touch_distance(&self) -> Option<f32> {
        let mut it = self.touches.values();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => Some(a.last.distance(b.last)),
            _ => None,
        }
    }

    fn primary_position(&self) -> Option<Vec2> {
        match self.modality {
            Modality::Touch => self.touches.values().next().map(|t| t.last),
            Modality::Pointer => self.pointer,
        }
    }

    /// Produce the snapshot for this tick and reset one-shot gestures.
    pub fn update(&mut self, dt: f32) -> &InputSnapshot {
        self.clock += dt;
        let position = self.primary_position();

        let velocity = match (position, self.last_sampled) {
            (Some(now), Some(before)) if dt > 0.0 => (now - before) / dt,
            _ => Vec2::ZERO,
        };
        self.last_sampled = position;

        let mut smoothed = self.snapshot.smoothed;
        if let Some(target) = position {
            if self.snapshot.position.is_none() && smoothed == Vec2::ZERO {
                smoothed = target;
            } else {
                let k = 1.0 - (1.0 - SMOOTHING).powf(dt * 60.0);
                smoothed += (target - smoothed) * k;
            }
        }

        let idle_time = if self.active {
            0.0
        } else {
            self.snapshot.idle_time + dt
        };

        let mut segment_points = self.touches.values().map(|t| t.last);
        let touch_segment = match (segment_points.next(), segment_points.next()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        };

        self.snapshot = InputSnapshot {
            position,
            smoothed,
            velocity,
            modality: self.modality,
            pressed: self.press_origin.is_some() || !self.touches.is_empty(),
            touches: self.touches.len(),
            touch_segment,
            pinch: self.pinch_accum,
            swipe: self.swipe.take(),
            click: self.click.take(),
            tilt: self.tilt,
            idle_time,
        };
        self.pinch_accum = 1.0;
        self.active = false;
        &self.snapshot
    }

    /// Translate a winit window event.
    #[cfg(feature = "viewer")]
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) {
        use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let pos = Vec2::new(position.x as f32, position.y as f32);
                self.handle_event(InputEvent::PointerMove { pos });
            }
            WindowEvent::CursorLeft { .. } => self.handle_event(InputEvent::PointerLeave),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(pos) = self.pointer else { return };
                match state {
                    ElementState::Pressed => self.handle_event(InputEvent::PointerDown { pos }),
                    ElementState::Released => self.handle_event(InputEvent::PointerUp { pos }),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 100.0,
                };
                self.handle_event(InputEvent::Zoom { delta });
            }
            WindowEvent::Touch(touch) => {
                let pos = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                let id = touch.id;
                match touch.phase {
                    TouchPhase::Started => self.handle_event(InputEvent::TouchStart { id, pos }),
                    TouchPhase::Moved => self.handle_event(InputEvent::TouchMove { id, pos }),
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.handle_event(InputEvent::TouchEnd { id })
                    }
                }
            }
            _ => {}
        }
    }
}

impl Default for InputUnifier {
    fn default() -> Self {
        Self::new()
    }
}
