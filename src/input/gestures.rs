//! Touch gesture classification
//!
//! Host-agnostic: callers feed abstract touch points with timestamps
//! (a browser shim, a touch screen, or the TUI's mouse mapping) and get
//! back taps, double-taps, swipes and pinch scales. No clocks are read
//! here; every transition takes the caller's `Instant`.

use std::time::{Duration, Instant};

/// Second tap within this window forms a double-tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Minimum displacement magnitude for a swipe.
pub const SWIPE_MIN_DISTANCE: f32 = 50.0;

/// A swipe must complete within this window.
pub const SWIPE_MAX_DURATION: Duration = Duration::from_millis(500);

/// Movement below this magnitude still counts as a tap.
pub const TAP_SLOP: f32 = 10.0;

/// Final pinch scale above this triggers zoom-in.
pub const PINCH_ZOOM_IN_THRESHOLD: f32 = 1.2;

/// Final pinch scale below this triggers zoom-out.
pub const PINCH_ZOOM_OUT_THRESHOLD: f32 = 0.8;

/// One touch contact position in layout units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_to(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Classified gestures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Tap,
    DoubleTap,
    Swipe(SwipeDirection),
    /// Both fingers still down; scale is current / initial distance.
    PinchUpdate { scale: f32 },
    /// Fingers released; final scale.
    PinchEnd { scale: f32 },
}

/// What a finished pinch asks of the zoom state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomIntent {
    In,
    Out,
}

/// Map a final pinch scale to a zoom action, if it crossed a threshold.
#[must_use]
pub fn pinch_zoom(scale: f32) -> Option<ZoomIntent> {
    if scale > PINCH_ZOOM_IN_THRESHOLD {
        Some(ZoomIntent::In)
    } else if scale < PINCH_ZOOM_OUT_THRESHOLD {
        Some(ZoomIntent::Out)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug)]
enum ActiveTouch {
    Single {
        start: TouchPoint,
        last: TouchPoint,
        started_at: Instant,
    },
    Pinch {
        initial_distance: f32,
        last_distance: f32,
    },
}

/// Incremental gesture state machine over raw touch transitions.
#[derive(Debug, Default)]
pub struct GestureRecognizer {
    active: Option<ActiveTouch>,
    last_tap_at: Option<Instant>,
}

impl GestureRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A contact began (or a second finger landed).
    pub fn touch_start(&mut self, points: &[TouchPoint], at: Instant) {
        match points {
            [] => {}
            [point] => {
                self.active = Some(ActiveTouch::Single {
                    start: *point,
                    last: *point,
                    started_at: at,
                });
            }
            [a, b, ..] => {
                let distance = a.distance_to(*b).max(f32::EPSILON);
                self.active = Some(ActiveTouch::Pinch {
                    initial_distance: distance,
                    last_distance: distance,
                });
            }
        }
    }

    /// Contacts moved. Pinches report their scale continuously.
    pub fn touch_move(&mut self, points: &[TouchPoint], at: Instant) -> Option<Gesture> {
        match (self.active, points) {
            (Some(ActiveTouch::Single { start, started_at, .. }), [point]) => {
                self.active = Some(ActiveTouch::Single {
                    start,
                    last: *point,
                    started_at,
                });
                None
            }
            // Second finger landed mid-gesture: becomes a pinch
            (Some(ActiveTouch::Single { .. }) | None, [_, _, ..]) => {
                self.touch_start(points, at);
                None
            }
            (Some(ActiveTouch::Pinch { initial_distance, .. }), [a, b, ..]) => {
                let distance = a.distance_to(*b).max(f32::EPSILON);
                self.active = Some(ActiveTouch::Pinch {
                    initial_distance,
                    last_distance: distance,
                });
                Some(Gesture::PinchUpdate {
                    scale: distance / initial_distance,
                })
            }
            _ => None,
        }
    }

    /// All contacts lifted: classify what the touch was.
    pub fn touch_end(&mut self, at: Instant) -> Option<Gesture> {
        match self.active.take()? {
            ActiveTouch::Pinch {
                initial_distance,
                last_distance,
            } => Some(Gesture::PinchEnd {
                scale: last_distance / initial_distance,
            }),
            ActiveTouch::Single {
                start,
                last,
                started_at,
            } => {
                let displacement = start.distance_to(last);
                let duration = at.saturating_duration_since(started_at);

                if displacement >= SWIPE_MIN_DISTANCE && duration <= SWIPE_MAX_DURATION {
                    return Some(Gesture::Swipe(swipe_direction(start, last)));
                }
                if displacement <= TAP_SLOP {
                    if let Some(prev) = self.last_tap_at {
                        if at.saturating_duration_since(prev) <= DOUBLE_TAP_WINDOW {
                            self.last_tap_at = None;
                            return Some(Gesture::DoubleTap);
                        }
                    }
                    self.last_tap_at = Some(at);
                    return Some(Gesture::Tap);
                }
                // Slow drag: scrolling, not a gesture
                None
            }
        }
    }
}

fn swipe_direction(start: TouchPoint, end: TouchPoint) -> SwipeDirection {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    } else if dy > 0.0 {
        SwipeDirection::Down
    } else {
        SwipeDirection::Up
    }
}
