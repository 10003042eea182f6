//! Discrete page navigation
//!
//! First/previous/next/last/go-to as jumps rather than continuous
//! scroll. A jump widens the virtualization window around the target
//! before the scroll animation gets there, reports the destination page
//! optimistically, and keeps the widened buffer until a settle deadline
//! passes.

use std::time::{Duration, Instant};

use crate::geometry::{PageGeometry, PageRange};

/// How long a smooth scroll is assumed to stay in flight.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Host-measured scroll container metrics, needed for the last-page
/// special case.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    /// Real total scrollable height.
    pub scroll_height: f32,
    /// Visible height of the container.
    pub client_height: f32,
}

/// A jump the host should carry out.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationJump {
    /// Destination page, already reported optimistically.
    pub page: usize,
    /// Absolute offset to smooth-scroll to.
    pub scroll_to: f32,
    /// Pre-widened window to mount before scrolling.
    pub visible: PageRange,
}

/// Explicit navigation handle for one reader.
///
/// Sibling UI drives the reader through this value's methods; there is
/// no mutable callback object to populate.
#[derive(Debug, Default)]
pub struct NavigationController {
    current_page: usize,
    navigating_until: Option<Instant>,
}

impl NavigationController {
    #[must_use]
    pub fn new(initial_page: usize) -> Self {
        Self {
            current_page: initial_page,
            navigating_until: None,
        }
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Whether a jump is still settling at `now` (the widened buffer
    /// stays active while true).
    #[must_use]
    pub fn is_navigating(&self, now: Instant) -> bool {
        self.navigating_until.is_some_and(|deadline| now < deadline)
    }

    /// Clear an expired settle deadline. Returns `true` when the flag
    /// actually flipped, so the host knows to narrow the window again.
    pub fn settle(&mut self, now: Instant) -> bool {
        if self.navigating_until.is_some_and(|deadline| now >= deadline) {
            self.navigating_until = None;
            return true;
        }
        false
    }

    /// Track a page change that came from scrolling rather than a jump.
    pub fn sync_page(&mut self, page: usize) {
        self.current_page = page;
    }

    /// Jump to page `n`.
    ///
    /// Out-of-range targets are silently ignored: the caller's UI may
    /// briefly disagree with the real page count and that is not an
    /// error. The destination page is recorded immediately; the host
    /// emits it without waiting for the scroll to finish.
    pub fn navigate_to(
        &mut self,
        n: usize,
        geometry: &PageGeometry,
        viewport: ViewportMetrics,
        now: Instant,
    ) -> Option<NavigationJump> {
        let total = geometry.total_pages();
        if n == 0 || n > total {
            log::debug!("ignoring navigation to out-of-range page {n} of {total}");
            return None;
        }

        let visible = geometry.predictive_range(n)?;
        self.navigating_until = Some(now + SETTLE_DELAY);
        self.current_page = n;

        // The averaged position estimate accumulates error over a long
        // document; for the final page, the real container end is the
        // only offset guaranteed to land there.
        let scroll_to = if n == total {
            (viewport.scroll_height - viewport.client_height).max(0.0)
        } else {
            geometry.page_position(n)
        };

        Some(NavigationJump {
            page: n,
            scroll_to,
            visible,
        })
    }

    pub fn navigate_first(
        &mut self,
        geometry: &PageGeometry,
        viewport: ViewportMetrics,
        now: Instant,
    ) -> Option<NavigationJump> {
        self.navigate_to(1, geometry, viewport, now)
    }

    pub fn navigate_last(
        &mut self,
        geometry: &PageGeometry,
        viewport: ViewportMetrics,
        now: Instant,
    ) -> Option<NavigationJump> {
        self.navigate_to(geometry.total_pages(), geometry, viewport, now)
    }

    pub fn navigate_next(
        &mut self,
        geometry: &PageGeometry,
        viewport: ViewportMetrics,
        now: Instant,
    ) -> Option<NavigationJump> {
        self.navigate_to(self.current_page + 1, geometry, viewport, now)
    }

    pub fn navigate_previous(
        &mut self,
        geometry: &PageGeometry,
        viewport: ViewportMetrics,
        now: Instant,
    ) -> Option<NavigationJump> {
        if self.current_page <= 1 {
            return None;
        }
        self.navigate_to(self.current_page - 1, geometry, viewport, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ViewportMetrics {
        ViewportMetrics {
            scroll_height: 300_000.0,
            client_height: 800.0,
        }
    }

    #[test]
    fn jump_pre_mounts_the_destination() {
        let geometry = PageGeometry::new(500);
        let mut nav = NavigationController::new(1);
        let jump = nav
            .navigate_to(250, &geometry, metrics(), Instant::now())
            .unwrap();

        assert!(jump.visible.contains(250));
        assert!(jump.visible.start >= 1 && jump.visible.end <= 500);
        assert_eq!(nav.current_page(), 250);
        assert!((jump.scroll_to - geometry.page_position(250)).abs() < 0.01);
    }

    #[test]
    fn out_of_range_jump_is_silently_ignored() {
        let geometry = PageGeometry::new(500);
        let mut nav = NavigationController::new(42);
        let now = Instant::now();

        assert!(nav.navigate_to(0, &geometry, metrics(), now).is_none());
        assert!(nav.navigate_to(501, &geometry, metrics(), now).is_none());
        assert_eq!(nav.current_page(), 42);
        assert!(!nav.is_navigating(now));
    }

    #[test]
    fn last_page_scrolls_to_true_container_end() {
        let geometry = PageGeometry::new(500);
        let mut nav = NavigationController::new(1);
        let jump = nav
            .navigate_last(&geometry, metrics(), Instant::now())
            .unwrap();

        assert_eq!(jump.page, 500);
        assert_eq!(jump.scroll_to, 300_000.0 - 800.0);
        assert!(jump.visible.contains(500));
        assert!(jump.visible.start >= 490 - crate::geometry::DEFAULT_NAV_BUFFER);
    }

    #[test]
    fn navigating_flag_clears_after_settle_delay() {
        let geometry = PageGeometry::new(500);
        let mut nav = NavigationController::new(1);
        let start = Instant::now();
        nav.navigate_to(100, &geometry, metrics(), start);

        assert!(nav.is_navigating(start));
        assert!(nav.is_navigating(start + Duration::from_millis(999)));
        assert!(!nav.settle(start + Duration::from_millis(500)));

        let after = start + SETTLE_DELAY + Duration::from_millis(1);
        assert!(!nav.is_navigating(after));
        assert!(nav.settle(after));
        assert!(!nav.settle(after));
    }

    #[test]
    fn next_and_previous_step_and_clamp() {
        let geometry = PageGeometry::new(10);
        let mut nav = NavigationController::new(1);
        let now = Instant::now();

        assert!(nav.navigate_previous(&geometry, metrics(), now).is_none());
        assert!(nav.navigate_next(&geometry, metrics(), now).is_some());
        assert_eq!(nav.current_page(), 2);

        nav.sync_page(10);
        assert!(nav.navigate_next(&geometry, metrics(), now).is_none());
        assert_eq!(nav.current_page(), 10);

        let jump = nav.navigate_previous(&geometry, metrics(), now).unwrap();
        assert_eq!(jump.page, 9);
    }
}
