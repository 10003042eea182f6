//! Input translation: keyboard, scroll ticks, touch gestures

mod gestures;
mod keys;
mod scroll;

pub use gestures::{
    pinch_zoom, Gesture, GestureRecognizer, SwipeDirection, TouchPoint, ZoomIntent,
    DOUBLE_TAP_WINDOW, PINCH_ZOOM_IN_THRESHOLD, PINCH_ZOOM_OUT_THRESHOLD, SWIPE_MAX_DURATION,
    SWIPE_MIN_DISTANCE, TAP_SLOP,
};
pub use keys::{translate_key, InputCommand, KEY_SCROLL_FRACTION};
pub use scroll::{ScrollController, ScrollTick};
