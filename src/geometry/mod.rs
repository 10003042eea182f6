//! Page geometry and virtualization engine
//!
//! Format-agnostic answers to "which pages are visible" and "where is
//! page N vertically" for documents whose page heights are learned
//! incrementally. Heights are in layout units; the host decides what a
//! unit maps to on screen.

mod manager;
mod preload;
mod window;

pub use manager::{PageGeometry, PageRange};
pub use preload::{preload_pages, MeasureError, PageMeasure, PreloadEvent, Preloader};
pub use window::{PageSlot, PageWindow, WindowDiff};

/// Fallback height for a page whose real height is not yet known.
pub const ESTIMATED_PAGE_HEIGHT: f32 = 600.0;

/// Vertical margin between consecutive pages.
pub const PAGE_MARGIN: f32 = 16.0;

/// Extra pages mounted on each side of the viewport during ordinary scroll.
pub const DEFAULT_SCROLL_BUFFER: usize = 3;

/// Widened buffer used while a discrete navigation is in flight.
pub const DEFAULT_NAV_BUFFER: usize = 10;

/// Radius of the window pre-mounted around a navigation target.
pub const PREDICTIVE_RADIUS: usize = 10;

/// Pages measured per preload batch before yielding.
pub const PRELOAD_BATCH: usize = 10;

/// Documents below this page count skip the preload pass entirely.
pub const PRELOAD_MIN_PAGES: usize = 50;
