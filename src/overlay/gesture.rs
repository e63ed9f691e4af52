//! Single-pointer gesture recognition for the floating player.
//!
//! The tracker is fed discrete pointer events in screen coordinates and
//! reports taps, drags and long presses. It knows nothing about windows or
//! video; the caller turns drag offsets into window moves.

use iced::Point;
use std::time::{Duration, Instant};

pub const LONG_PRESS_TIMEOUT: Duration = Duration::from_millis(500);
/// Distance a pointer may travel before a press becomes a drag.
pub const TOUCH_SLOP: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Down and still inside the slop.
    Pressed,
    Dragging,
    /// The long press fired; the rest of this gesture is ignored.
    Consumed,
}

/// Window offset in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Move the window to this offset.
    Drag(Offset),
    Tap,
    LongPress,
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    phase: Phase,
    origin: Offset,
    reference: Point,
    pressed_at: Option<Instant>,
}

impl Default for GestureTracker {
    fn default() -> Self {
        GestureTracker {
            phase: Phase::Idle,
            origin: Offset::default(),
            reference: Point::ORIGIN,
            pressed_at: None,
        }
    }
}

impl GestureTracker {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the tracker needs clock ticks to detect a long press.
    pub fn awaiting_long_press(&self) -> bool {
        self.phase == Phase::Pressed
    }

    /// Pointer went down at `raw` while the window sat at `window_offset`.
    pub fn down(&mut self, window_offset: Offset, raw: Point, now: Instant) {
        self.phase = Phase::Pressed;
        self.origin = window_offset;
        self.reference = raw;
        self.pressed_at = Some(now);
    }

    pub fn moved(&mut self, raw: Point) -> Option<Gesture> {
        match self.phase {
            Phase::Pressed => {
                if raw.distance(self.reference) <= TOUCH_SLOP {
                    return None;
                }
                self.phase = Phase::Dragging;
                Some(Gesture::Drag(self.offset_for(raw)))
            }
            Phase::Dragging => Some(Gesture::Drag(self.offset_for(raw))),
            Phase::Idle | Phase::Consumed => None,
        }
    }

    pub fn up(&mut self) -> Option<Gesture> {
        let gesture = match self.phase {
            Phase::Pressed => Some(Gesture::Tap),
            _ => None,
        };
        self.reset();
        gesture
    }

    pub fn tick(&mut self, now: Instant) -> Option<Gesture> {
        if self.phase != Phase::Pressed {
            return None;
        }
        let pressed_at = self.pressed_at?;
        if now.saturating_duration_since(pressed_at) >= LONG_PRESS_TIMEOUT {
            self.phase = Phase::Consumed;
            Some(Gesture::LongPress)
        } else {
            None
        }
    }

    /// Abandon the current gesture without reporting anything.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn offset_for(&self, raw: Point) -> Offset {
        let delta = raw - self.reference;
        Offset {
            x: self.origin.x + delta.x.round() as i32,
            y: self.origin.y + delta.y.round() as i32,
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.pressed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed_at(x: i32, y: i32, raw: Point) -> (GestureTracker, Instant) {
        let mut tracker = GestureTracker::default();
        let now = Instant::now();
        tracker.down(Offset { x, y }, raw, now);
        (tracker, now)
    }

    #[test]
    fn drag_moves_by_pointer_delta() {
        let (mut tracker, _) = pressed_at(100, 40, Point::new(500.0, 300.0));

        let gesture = tracker.moved(Point::new(530.0, 280.0));
        assert_eq!(gesture, Some(Gesture::Drag(Offset { x: 130, y: 20 })));
        assert_eq!(tracker.phase(), Phase::Dragging);
    }

    #[test]
    fn many_small_moves_end_where_one_large_move_does() {
        let (mut stepped, _) = pressed_at(10, 10, Point::new(0.0, 0.0));
        let mut last = None;
        for step in 1..=40 {
            last = stepped.moved(Point::new(step as f32 * 3.0, step as f32 * -2.0));
        }

        let (mut direct, _) = pressed_at(10, 10, Point::new(0.0, 0.0));
        let jump = direct.moved(Point::new(120.0, -80.0));

        assert_eq!(last, jump);
        assert_eq!(jump, Some(Gesture::Drag(Offset { x: 130, y: -70 })));
    }

    #[test]
    fn consecutive_drags_compose() {
        let mut tracker = GestureTracker::default();
        let now = Instant::now();

        tracker.down(Offset { x: 0, y: 0 }, Point::new(50.0, 50.0), now);
        let Some(Gesture::Drag(first)) = tracker.moved(Point::new(75.0, 90.0)) else {
            panic!("expected drag");
        };
        assert_eq!(tracker.up(), None);

        tracker.down(first, Point::new(200.0, 200.0), now);
        let second = tracker.moved(Point::new(185.0, 230.0));

        assert_eq!(second, Some(Gesture::Drag(Offset { x: 10, y: 70 })));
    }

    #[test]
    fn movement_inside_slop_is_still_a_tap() {
        let (mut tracker, _) = pressed_at(0, 0, Point::new(10.0, 10.0));
        assert_eq!(tracker.moved(Point::new(13.0, 14.0)), None);
        assert_eq!(tracker.up(), Some(Gesture::Tap));
        assert_eq!(tracker.phase(), Phase::Idle);
    }

    #[test]
    fn release_after_drag_is_not_a_tap() {
        let (mut tracker, _) = pressed_at(0, 0, Point::ORIGIN);
        tracker.moved(Point::new(40.0, 0.0));
        assert_eq!(tracker.up(), None);
    }

    #[test]
    fn long_press_fires_once_after_timeout() {
        let (mut tracker, start) = pressed_at(0, 0, Point::ORIGIN);

        assert_eq!(tracker.tick(start + Duration::from_millis(200)), None);
        assert_eq!(tracker.tick(start + LONG_PRESS_TIMEOUT), Some(Gesture::LongPress));
        assert_eq!(tracker.tick(start + LONG_PRESS_TIMEOUT * 2), None);
        assert_eq!(tracker.moved(Point::new(100.0, 100.0)), None);
        assert_eq!(tracker.up(), None);
    }

    #[test]
    fn dragging_never_turns_into_long_press() {
        let (mut tracker, start) = pressed_at(0, 0, Point::ORIGIN);
        tracker.moved(Point::new(50.0, 0.0));
        assert_eq!(tracker.tick(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn cancel_discards_the_gesture() {
        let (mut tracker, _) = pressed_at(0, 0, Point::ORIGIN);
        tracker.cancel();
        assert_eq!(tracker.up(), None);
        assert!(!tracker.awaiting_long_press());
    }
}
