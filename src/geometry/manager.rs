//! Incremental page-height tracking and scroll mapping

use super::{
    DEFAULT_NAV_BUFFER, DEFAULT_SCROLL_BUFFER, ESTIMATED_PAGE_HEIGHT, PAGE_MARGIN,
    PREDICTIVE_RADIUS,
};

/// Closed interval of 1-based page numbers.
///
/// Always non-degenerate: `start <= end`. The empty case is represented
/// by `Option<PageRange>` at the call sites, never by a negative-length
/// range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// Build a range clamped to `[1, total]`, or `None` when the clamp
    /// leaves nothing.
    #[must_use]
    pub fn clamped(start: usize, end: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let start = start.clamp(1, total);
        let end = end.clamp(1, total);
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        page >= self.start && page <= self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Per-page height table and scroll/page mapping for one document.
///
/// The page count is fixed for the lifetime of the instance; opening a
/// new document means building a new `PageGeometry`, so heights from a
/// previous document can never leak into the next one.
#[derive(Debug)]
pub struct PageGeometry {
    total_pages: usize,
    heights: Vec<Option<f32>>,
    scroll_buffer: usize,
    nav_buffer: usize,
}

impl PageGeometry {
    #[must_use]
    pub fn new(total_pages: usize) -> Self {
        Self::with_buffers(total_pages, DEFAULT_SCROLL_BUFFER, DEFAULT_NAV_BUFFER)
    }

    #[must_use]
    pub fn with_buffers(total_pages: usize, scroll_buffer: usize, nav_buffer: usize) -> Self {
        Self {
            total_pages,
            heights: vec![None; total_pages],
            scroll_buffer,
            nav_buffer,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Height of a page: the recorded measurement, or the shared
    /// estimate when the page has not been measured yet.
    #[must_use]
    pub fn page_height(&self, page: usize) -> f32 {
        if page == 0 {
            return ESTIMATED_PAGE_HEIGHT;
        }
        self.heights
            .get(page - 1)
            .copied()
            .flatten()
            .unwrap_or(ESTIMATED_PAGE_HEIGHT)
    }

    /// Record a measured page height.
    ///
    /// Out-of-range pages are ignored; a non-finite or non-positive
    /// measurement records the fallback estimate instead, so position
    /// math never sees a zero or negative height.
    pub fn record_page_height(&mut self, page: usize, height: f32) {
        if page == 0 || page > self.total_pages {
            log::debug!("ignoring height for out-of-range page {page}");
            return;
        }
        let height = if height.is_finite() && height > 0.0 {
            height
        } else {
            ESTIMATED_PAGE_HEIGHT
        };
        self.heights[page - 1] = Some(height);
    }

    /// Whether the page already has a measured height.
    #[must_use]
    pub fn is_measured(&self, page: usize) -> bool {
        page >= 1 && self.heights.get(page - 1).copied().flatten().is_some()
    }

    /// Pages that still need measurement, in order.
    #[must_use]
    pub fn unmeasured_pages(&self) -> Vec<usize> {
        self.heights
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_none())
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Average of the measured heights, or the estimate when nothing
    /// has been measured. Converges toward the real mean as pages get
    /// rendered or preloaded.
    #[must_use]
    pub fn average_page_height(&self) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for h in self.heights.iter().flatten() {
            sum += h;
            count += 1;
        }
        if count == 0 {
            ESTIMATED_PAGE_HEIGHT
        } else {
            sum / count as f32
        }
    }

    /// Average vertical stride per page: height plus the inter-page margin.
    fn average_stride(&self) -> f32 {
        self.average_page_height() + PAGE_MARGIN
    }

    /// The page whose span the scroll offset falls into.
    #[must_use]
    pub fn page_at_offset(&self, scroll_offset: f32) -> usize {
        if self.total_pages == 0 {
            return 0;
        }
        let offset = scroll_offset.max(0.0);
        let index = (offset / self.average_stride()) as usize;
        index.saturating_add(1).clamp(1, self.total_pages)
    }

    /// Pages to keep mounted for the given viewport.
    ///
    /// Pads the on-screen span with the scroll buffer, or the wider
    /// navigation buffer while a discrete jump is in flight. Result is
    /// clamped to `[1, total]`; `None` only for an empty document.
    #[must_use]
    pub fn visible_range(
        &self,
        scroll_offset: f32,
        viewport_height: f32,
        navigating: bool,
    ) -> Option<PageRange> {
        if self.total_pages == 0 {
            return None;
        }
        let current = self.page_at_offset(scroll_offset);
        let stride = self.average_stride();
        let span = ((viewport_height.max(0.0) / stride).ceil() as usize).max(1);
        let buffer = if navigating {
            self.nav_buffer
        } else {
            self.scroll_buffer
        };
        let start = current.saturating_sub(buffer).max(1);
        let end = current.saturating_add(span - 1).saturating_add(buffer);
        PageRange::clamped(start, end, self.total_pages)
    }

    /// Fixed-radius window around a navigation target, mounted before
    /// the scroll animation arrives so the destination is already there.
    #[must_use]
    pub fn predictive_range(&self, target: usize) -> Option<PageRange> {
        if target == 0 || target > self.total_pages {
            return None;
        }
        PageRange::clamped(
            target.saturating_sub(PREDICTIVE_RADIUS),
            target + PREDICTIVE_RADIUS,
            self.total_pages,
        )
    }

    /// Absolute top of a page: cumulative heights of the pages before
    /// it, plus one margin per crossed boundary. O(n), acceptable since
    /// callers only ask near the viewport or a navigation target.
    #[must_use]
    pub fn page_position(&self, page: usize) -> f32 {
        let mut offset = 0.0f32;
        for p in 1..page {
            offset += self.page_height(p) + PAGE_MARGIN;
        }
        offset
    }

    /// Estimated full scrollable height, used to size the scroll
    /// container and derive the progress percentage.
    #[must_use]
    pub fn estimated_scroll_height(&self) -> f32 {
        self.total_pages as f32 * self.average_stride()
    }

    /// Reading progress for a scroll offset, clamped to `[0, 100]`.
    #[must_use]
    pub fn progress_percent(&self, scroll_offset: f32, viewport_height: f32) -> f32 {
        let scrollable = self.estimated_scroll_height() - viewport_height.max(0.0);
        if scrollable <= 0.0 {
            return 100.0;
        }
        (scroll_offset.max(0.0) / scrollable * 100.0).clamp(0.0, 100.0)
    }
}
