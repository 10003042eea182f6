//! Virtualized render window
//!
//! Decides, for every page of the document, whether the real content is
//! mounted or a fixed-geometry placeholder stands in for it. Keeping
//! placeholder heights and positions stable is what lets a 1,000-page
//! document scroll like a short one.

use super::manager::{PageGeometry, PageRange};

/// One entry in the full page column.
#[derive(Clone, Debug, PartialEq)]
pub enum PageSlot {
    /// Page is inside the window: render real content.
    Mounted { page: usize, top: f32 },
    /// Page is outside the window: reserve its estimated box.
    Placeholder { page: usize, top: f32, height: f32 },
}

impl PageSlot {
    #[must_use]
    pub fn page(&self) -> usize {
        match self {
            Self::Mounted { page, .. } | Self::Placeholder { page, .. } => *page,
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        matches!(self, Self::Mounted { .. })
    }
}

/// Pages that changed mount state between two consecutive windows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowDiff {
    pub mounted: Vec<usize>,
    pub unmounted: Vec<usize>,
}

impl WindowDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty() && self.unmounted.is_empty()
    }
}

/// Tracks the currently mounted range for one document.
#[derive(Debug, Default)]
pub struct PageWindow {
    visible: Option<PageRange>,
}

impl PageWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible(&self) -> Option<PageRange> {
        self.visible
    }

    #[must_use]
    pub fn is_mounted(&self, page: usize) -> bool {
        self.visible.is_some_and(|r| r.contains(page))
    }

    /// Replace the window, re-clamping defensively, and report which
    /// pages entered and left. Adapters use the diff to render newcomers
    /// and release content held for departed pages.
    pub fn apply(&mut self, range: Option<PageRange>, total_pages: usize) -> WindowDiff {
        let next = range.and_then(|r| PageRange::clamped(r.start, r.end, total_pages));
        let mut diff = WindowDiff::default();

        match (self.visible, next) {
            (None, None) => {}
            (None, Some(new)) => diff.mounted.extend(new.pages()),
            (Some(old), None) => diff.unmounted.extend(old.pages()),
            (Some(old), Some(new)) => {
                diff.mounted
                    .extend(new.pages().filter(|p| !old.contains(*p)));
                diff.unmounted
                    .extend(old.pages().filter(|p| !new.contains(*p)));
            }
        }

        self.visible = next;
        diff
    }

    /// Materialize the full page column: mounted slots inside the
    /// window, placeholders with estimated geometry outside it.
    #[must_use]
    pub fn slots(&self, geometry: &PageGeometry) -> Vec<PageSlot> {
        let total = geometry.total_pages();
        let mut slots = Vec::with_capacity(total);
        let mut top = 0.0f32;
        for page in 1..=total {
            let height = geometry.page_height(page);
            if self.is_mounted(page) {
                slots.push(PageSlot::Mounted { page, top });
            } else {
                slots.push(PageSlot::Placeholder { page, top, height });
            }
            top += height + super::PAGE_MARGIN;
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reports_entering_and_leaving_pages() {
        let mut window = PageWindow::new();
        let diff = window.apply(PageRange::clamped(1, 5, 100), 100);
        assert_eq!(diff.mounted, vec![1, 2, 3, 4, 5]);
        assert!(diff.unmounted.is_empty());

        let diff = window.apply(PageRange::clamped(3, 7, 100), 100);
        assert_eq!(diff.mounted, vec![6, 7]);
        assert_eq!(diff.unmounted, vec![1, 2]);
    }

    #[test]
    fn apply_none_unmounts_everything() {
        let mut window = PageWindow::new();
        window.apply(PageRange::clamped(10, 12, 100), 100);
        let diff = window.apply(None, 100);
        assert_eq!(diff.unmounted, vec![10, 11, 12]);
        assert!(window.visible().is_none());
    }

    #[test]
    fn apply_reclamps_against_total() {
        let mut window = PageWindow::new();
        // A stale range wider than the document must never survive
        let diff = window.apply(PageRange::clamped(8, 20, 20), 10);
        assert_eq!(window.visible(), Some(PageRange { start: 8, end: 10 }));
        assert_eq!(diff.mounted, vec![8, 9, 10]);
    }

    #[test]
    fn identical_range_is_a_no_op() {
        let mut window = PageWindow::new();
        window.apply(PageRange::clamped(1, 5, 100), 100);
        let diff = window.apply(PageRange::clamped(1, 5, 100), 100);
        assert!(diff.is_empty());
    }

    #[test]
    fn slots_cover_every_page_with_stable_geometry() {
        let mut geometry = PageGeometry::new(6);
        geometry.record_page_height(2, 300.0);
        let mut window = PageWindow::new();
        window.apply(PageRange::clamped(2, 3, 6), 6);

        let slots = window.slots(&geometry);
        assert_eq!(slots.len(), 6);
        assert!(slots[1].is_mounted() && slots[2].is_mounted());
        assert!(!slots[0].is_mounted() && !slots[5].is_mounted());

        // Placeholder tops match the geometry's own positions
        for slot in &slots {
            let expected = geometry.page_position(slot.page());
            match slot {
                PageSlot::Mounted { top, .. } | PageSlot::Placeholder { top, .. } => {
                    assert!((top - expected).abs() < 0.01);
                }
            }
        }
    }
}
