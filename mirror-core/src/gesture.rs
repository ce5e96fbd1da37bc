//! Per-pointer-session gesture classification.
//!
//! A pure state machine: press/move/release events plus a long-press
//! timer expiry are fed in, and at most one [`Gesture`] comes out per
//! pointer session. Timekeeping is passed in by the caller so the
//! machine is fully deterministic under test; the async timer itself
//! lives in [`crate::input`].
//!
//! ```text
//!  Idle ──press──► Pressing ──move > cancel threshold──► Moving
//!                     │                                    │
//!                     └───timer, still within threshold────┤
//!                     ▼                                    ▼
//!               LongPressFired ◄───────────────────────────┘
//!                     │
//!  Idle ◄──release────┴──────────(all phases)
//! ```
//!
//! Stale timers are rejected by press-id comparison: every press
//! allocates a new id, the scheduled timer captures it, and expiry is
//! honoured only while the captured id is still live.

use std::time::{Duration, Instant};

use crate::geometry::Point;

// ── Constants ────────────────────────────────────────────────────

/// Release within this distance of the press point is a tap;
/// at or beyond it, a swipe.
pub const SWIPE_THRESHOLD: f64 = 12.0;

/// Movement beyond this distance cancels a pending long-press.
pub const LONG_PRESS_CANCEL_DISTANCE: f64 = 8.0;

/// Hold duration after which a long-press fires.
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(500);

/// Minimum interval between two emitted taps.
pub const TAP_DEBOUNCE: Duration = Duration::from_millis(180);

// ── Gesture ──────────────────────────────────────────────────────

/// A recognised gesture, in UI-viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap(Point),
    Swipe { from: Point, to: Point },
    LongPress { at: Point, duration_ms: u64 },
}

// ── GesturePhase ─────────────────────────────────────────────────

/// Phase of the current pointer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    /// No pointer down.
    #[default]
    Idle,
    /// Pointer down, little movement, long-press still pending.
    Pressing,
    /// Pointer moved past the cancel threshold; long-press disarmed.
    Moving,
    /// The long-press fired; release must emit nothing.
    LongPressFired,
}

// ── GestureClassifier ────────────────────────────────────────────

/// The gesture state machine. Owned exclusively by the input-event
/// context; never shared across threads.
#[derive(Debug, Default)]
pub struct GestureClassifier {
    phase: GesturePhase,
    /// Monotonically increasing id of the current press session.
    press_id: u64,
    start: Point,
    current: Point,
    /// Whether the scheduled long-press may still fire.
    long_press_armed: bool,
    /// Set once the long-press emitted, suppressing release output.
    action_triggered: bool,
    last_tap_at: Option<Instant>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase (for diagnostics).
    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Begin a new pointer session at `p`.
    ///
    /// Returns the newly allocated press id. The caller must schedule
    /// a long-press timer for [`LONG_PRESS_DURATION`] capturing that
    /// id and feed its expiry to [`long_press_elapsed`].
    ///
    /// [`long_press_elapsed`]: Self::long_press_elapsed
    pub fn press(&mut self, p: Point) -> u64 {
        self.press_id = self.press_id.wrapping_add(1);
        self.start = p;
        self.current = p;
        self.action_triggered = false;
        self.long_press_armed = true;
        self.phase = GesturePhase::Pressing;
        self.press_id
    }

    /// Update the pointer position mid-press.
    pub fn motion(&mut self, p: Point) {
        if self.phase == GesturePhase::Idle {
            return;
        }
        self.current = p;
        if self.phase == GesturePhase::Pressing
            && self.start.distance_to(p) > LONG_PRESS_CANCEL_DISTANCE
        {
            self.long_press_armed = false;
            self.phase = GesturePhase::Moving;
        }
    }

    /// Handle expiry of the long-press timer scheduled for `press_id`.
    ///
    /// Emits a long-press only when the captured id is still live, the
    /// timer was not disarmed, and the pointer stayed within the
    /// cancel threshold.
    pub fn long_press_elapsed(&mut self, press_id: u64) -> Option<Gesture> {
        if press_id != self.press_id || !self.long_press_armed {
            return None; // superseded or cancelled timer
        }
        if !matches!(self.phase, GesturePhase::Pressing | GesturePhase::Moving) {
            return None;
        }
        if self.start.distance_to(self.current) > LONG_PRESS_CANCEL_DISTANCE {
            return None;
        }

        self.long_press_armed = false;
        self.action_triggered = true;
        self.phase = GesturePhase::LongPressFired;
        Some(Gesture::LongPress {
            at: self.start,
            duration_ms: LONG_PRESS_DURATION.as_millis() as u64,
        })
    }

    /// End the pointer session at `p`.
    ///
    /// Emits a tap (debounced) or swipe unless a long-press already
    /// fired. Always resets to [`GesturePhase::Idle`].
    pub fn release(&mut self, p: Point, now: Instant) -> Option<Gesture> {
        if self.phase == GesturePhase::Idle {
            return None;
        }
        self.long_press_armed = false;

        let gesture = if self.action_triggered || self.phase == GesturePhase::LongPressFired {
            None
        } else if self.start.distance_to(p) < SWIPE_THRESHOLD {
            let debounced = self
                .last_tap_at
                .is_some_and(|t| now.duration_since(t) < TAP_DEBOUNCE);
            if debounced {
                None
            } else {
                self.last_tap_at = Some(now);
                Some(Gesture::Tap(self.start))
            }
        } else {
            Some(Gesture::Swipe {
                from: self.start,
                to: p,
            })
        };

        self.phase = GesturePhase::Idle;
        self.action_triggered = false;
        gesture
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn short_press_release_is_tap_at_press_point() {
        let mut g = GestureClassifier::new();
        g.press(pt(100, 200));
        g.motion(pt(103, 202)); // well under the swipe threshold
        let out = g.release(pt(103, 202), Instant::now());
        assert_eq!(out, Some(Gesture::Tap(pt(100, 200))));
        assert_eq!(g.phase(), GesturePhase::Idle);
    }

    #[test]
    fn movement_past_threshold_is_swipe_never_tap() {
        let mut g = GestureClassifier::new();
        g.press(pt(50, 50));
        g.motion(pt(80, 50));
        let out = g.release(pt(100, 50), Instant::now());
        assert_eq!(
            out,
            Some(Gesture::Swipe {
                from: pt(50, 50),
                to: pt(100, 50),
            })
        );
    }

    #[test]
    fn release_exactly_at_threshold_is_swipe() {
        let mut g = GestureClassifier::new();
        g.press(pt(0, 0));
        let out = g.release(pt(12, 0), Instant::now());
        assert!(matches!(out, Some(Gesture::Swipe { .. })));
    }

    #[test]
    fn held_press_fires_long_press_and_suppresses_release() {
        let mut g = GestureClassifier::new();
        let id = g.press(pt(10, 10));
        g.motion(pt(12, 11)); // within cancel distance

        let fired = g.long_press_elapsed(id);
        assert_eq!(
            fired,
            Some(Gesture::LongPress {
                at: pt(10, 10),
                duration_ms: 500,
            })
        );
        assert_eq!(g.phase(), GesturePhase::LongPressFired);

        // Subsequent release emits nothing.
        assert_eq!(g.release(pt(12, 11), Instant::now()), None);
        assert_eq!(g.phase(), GesturePhase::Idle);
    }

    #[test]
    fn movement_cancels_long_press() {
        let mut g = GestureClassifier::new();
        let id = g.press(pt(0, 0));
        g.motion(pt(30, 0)); // past the cancel threshold → Moving
        assert_eq!(g.phase(), GesturePhase::Moving);
        assert_eq!(g.long_press_elapsed(id), None);
    }

    #[test]
    fn stale_timer_from_previous_press_is_discarded() {
        let mut g = GestureClassifier::new();
        let first = g.press(pt(0, 0));
        g.release(pt(0, 0), Instant::now());

        // New press before the first timer fires.
        let second = g.press(pt(5, 5));
        assert_eq!(g.long_press_elapsed(first), None);

        // The live press's timer still works.
        assert!(g.long_press_elapsed(second).is_some());
    }

    #[test]
    fn rapid_taps_are_debounced() {
        let mut g = GestureClassifier::new();
        let t0 = Instant::now();

        g.press(pt(1, 1));
        assert!(g.release(pt(1, 1), t0).is_some());

        // Second tap 50 ms later: suppressed.
        g.press(pt(1, 1));
        assert_eq!(g.release(pt(1, 1), t0 + Duration::from_millis(50)), None);

        // Third tap past the debounce window: emitted.
        g.press(pt(1, 1));
        assert!(g
            .release(pt(1, 1), t0 + Duration::from_millis(200))
            .is_some());
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut g = GestureClassifier::new();
        assert_eq!(g.release(pt(0, 0), Instant::now()), None);
        assert_eq!(g.long_press_elapsed(1), None);
    }

    #[test]
    fn timer_after_release_is_ignored() {
        let mut g = GestureClassifier::new();
        let id = g.press(pt(0, 0));
        g.release(pt(0, 0), Instant::now());
        assert_eq!(g.long_press_elapsed(id), None);
    }
}
