//! The virtualized PDF reader

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::geometry::{
    PageGeometry, PageWindow, PreloadEvent, Preloader, ESTIMATED_PAGE_HEIGHT, PRELOAD_BATCH,
    PRELOAD_MIN_PAGES,
};
use crate::input::ScrollController;
use crate::navigation::{NavigationController, ViewportMetrics};
use crate::reader::{ReaderError, ReaderPhase, StateCallback, StateUpdate};

use super::cache::{CacheKey, PageCache, PageContent, DEFAULT_CACHE_SIZE};
use super::source::PdfSource;
use super::zoom::Zoom;

/// One page the host should draw this frame.
#[derive(Clone, Debug)]
pub struct VisiblePage {
    pub page: usize,
    /// Absolute top in document units.
    pub top: f32,
    /// Height in document units (measured or estimated).
    pub height: f32,
    /// Rendered content, or `None` for a page that failed to render
    /// (drawn as an empty box of the same height).
    pub content: Option<Arc<PageContent>>,
}

/// Tunables for the virtualized reader.
#[derive(Clone, Copy, Debug)]
pub struct PdfOptions {
    /// Zoom percent, 100 = baseline.
    pub zoom_percent: f32,
    /// Viewport height in screen units.
    pub viewport_height: f32,
    pub scroll_buffer: usize,
    pub nav_buffer: usize,
    pub preload_min_pages: usize,
    pub preload_batch: usize,
    pub cache_capacity: usize,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            zoom_percent: 100.0,
            viewport_height: 800.0,
            scroll_buffer: crate::geometry::DEFAULT_SCROLL_BUFFER,
            nav_buffer: crate::geometry::DEFAULT_NAV_BUFFER,
            preload_min_pages: PRELOAD_MIN_PAGES,
            preload_batch: PRELOAD_BATCH,
            cache_capacity: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Virtualized reader over a [`PdfSource`].
///
/// Owns its document handle exclusively; dropping the reader releases
/// the handle and cancels any in-flight preload pass.
pub struct PdfReader {
    name: String,
    phase: ReaderPhase,
    source: Option<Box<dyn PdfSource>>,
    geometry: PageGeometry,
    window: PageWindow,
    scroll: ScrollController,
    nav: NavigationController,
    zoom: Zoom,
    dark_mode: bool,
    cache: PageCache,
    preloader: Option<Preloader>,
    preload_fraction: Option<f32>,
    failed_pages: HashSet<usize>,
    scroll_offset: f32,
    viewport_height: f32,
    on_state: StateCallback,
}

impl PdfReader {
    /// Build a reader with default tunables.
    pub fn from_source(
        name: impl Into<String>,
        source: Result<Box<dyn PdfSource>, ReaderError>,
        zoom_percent: f32,
        viewport_height: f32,
        on_state: StateCallback,
    ) -> Self {
        Self::with_options(
            name,
            source,
            PdfOptions {
                zoom_percent,
                viewport_height,
                ..PdfOptions::default()
            },
            on_state,
        )
    }

    /// Build a reader from an already-opened source (or its load
    /// error). Emits the loading/loaded/failed lifecycle through the
    /// callback before returning.
    pub fn with_options(
        name: impl Into<String>,
        source: Result<Box<dyn PdfSource>, ReaderError>,
        options: PdfOptions,
        mut on_state: StateCallback,
    ) -> Self {
        on_state(StateUpdate {
            is_loading: Some(true),
            ..StateUpdate::default()
        });

        let source = source.and_then(|s| {
            if s.page_count() == 0 {
                Err(ReaderError::EmptyDocument)
            } else {
                Ok(s)
            }
        });

        match source {
            Err(error) => {
                log::error!("pdf load failed: {error}");
                on_state(StateUpdate::load_failed(&error));
                Self {
                    name: name.into(),
                    phase: ReaderPhase::Failed,
                    source: None,
                    geometry: PageGeometry::new(0),
                    window: PageWindow::new(),
                    scroll: ScrollController::new(),
                    nav: NavigationController::new(1),
                    zoom: Zoom::from_percent(options.zoom_percent),
                    dark_mode: false,
                    cache: PageCache::new(options.cache_capacity),
                    preloader: None,
                    preload_fraction: None,
                    failed_pages: HashSet::new(),
                    scroll_offset: 0.0,
                    viewport_height: options.viewport_height,
                    on_state,
                }
            }
            Ok(source) => {
                let total = source.page_count();
                let geometry =
                    PageGeometry::with_buffers(total, options.scroll_buffer, options.nav_buffer);
                let zoom = Zoom::from_percent(options.zoom_percent);
                let mut window = PageWindow::new();
                window.apply(
                    geometry.visible_range(0.0, options.viewport_height / zoom.factor(), false),
                    total,
                );

                let preloader = if total >= options.preload_min_pages {
                    Self::spawn_preload(source.as_ref(), &geometry, options.preload_batch)
                } else {
                    None
                };

                on_state(StateUpdate::loaded(total));
                log::info!("pdf ready: {total} pages");

                let mut scroll = ScrollController::new();
                scroll.note_page(1);

                Self {
                    name: name.into(),
                    phase: ReaderPhase::Ready,
                    source: Some(source),
                    geometry,
                    window,
                    scroll,
                    nav: NavigationController::new(1),
                    zoom,
                    dark_mode: false,
                    cache: PageCache::new(options.cache_capacity),
                    preloader,
                    preload_fraction: None,
                    failed_pages: HashSet::new(),
                    scroll_offset: 0.0,
                    viewport_height: options.viewport_height,
                    on_state,
                }
            }
        }
    }

    /// Open a PDF payload with the MuPDF engine.
    #[cfg(feature = "pdf")]
    pub fn open(
        name: impl Into<String>,
        bytes: Vec<u8>,
        zoom_percent: f32,
        viewport_height: f32,
        on_state: StateCallback,
    ) -> Self {
        let source = super::source::MupdfSource::open(bytes)
            .map(|s| Box::new(s) as Box<dyn PdfSource>);
        Self::from_source(name, source, zoom_percent, viewport_height, on_state)
    }

    fn spawn_preload(
        source: &dyn PdfSource,
        geometry: &PageGeometry,
        batch: usize,
    ) -> Option<Preloader> {
        match source.measure_handle() {
            Ok(handle) => Some(Preloader::spawn(
                handle,
                geometry.unmeasured_pages(),
                1.0,
                batch,
            )),
            Err(err) => {
                log::warn!("preload unavailable: {err}");
                None
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn phase(&self) -> ReaderPhase {
        self.phase
    }

    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.source.as_ref().and_then(|s| s.title())
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.geometry.total_pages()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.nav.current_page()
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    #[must_use]
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Preload progress in `[0, 1]`, if a pass has reported anything.
    #[must_use]
    pub fn preload_fraction(&self) -> Option<f32> {
        self.preload_fraction
    }

    #[must_use]
    pub fn is_navigating(&self, now: Instant) -> bool {
        self.nav.is_navigating(now)
    }

    #[must_use]
    pub fn visible_range(&self) -> Option<crate::geometry::PageRange> {
        self.window.visible()
    }

    #[must_use]
    pub fn estimated_scroll_height(&self) -> f32 {
        self.geometry.estimated_scroll_height()
    }

    /// Viewport height in document units at the current zoom.
    fn effective_viewport(&self) -> f32 {
        self.viewport_height / self.zoom.factor()
    }

    fn metrics(&self) -> ViewportMetrics {
        ViewportMetrics {
            scroll_height: self.geometry.estimated_scroll_height(),
            client_height: self.effective_viewport(),
        }
    }

    fn max_scroll(&self) -> f32 {
        (self.geometry.estimated_scroll_height() - self.effective_viewport()).max(0.0)
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if (self.viewport_height - height).abs() > f32::EPSILON {
            self.viewport_height = height;
            self.scroll.request_tick();
        }
    }

    /// Absolute scroll, clamped to the container.
    pub fn scroll_to(&mut self, offset: f32) {
        self.scroll_offset = offset.clamp(0.0, self.max_scroll());
        self.scroll.request_tick();
    }

    /// Scroll by a signed fraction of the viewport height.
    pub fn scroll_by_fraction(&mut self, fraction: f32) {
        self.scroll_to(self.scroll_offset + fraction * self.effective_viewport());
    }

    pub fn scroll_top(&mut self) {
        self.scroll_to(0.0);
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll_to(self.max_scroll());
    }

    /// Per-frame driver: drain preload results, settle navigation, run
    /// the pending scroll tick, and report page/progress changes.
    pub fn tick(&mut self, now: Instant) {
        if self.phase != ReaderPhase::Ready {
            return;
        }

        self.drain_preload();

        let settled = self.nav.settle(now);
        if self.scroll.tick_pending() || settled {
            let tick = self.scroll.process(
                &self.geometry,
                self.scroll_offset,
                self.effective_viewport(),
                self.nav.is_navigating(now),
            );
            self.window.apply(tick.visible, self.geometry.total_pages());
            if let Some(page) = tick.page_changed {
                self.nav.sync_page(page);
                let update = StateUpdate::at_page(page, self.geometry.total_pages())
                    .with_progress(tick.progress);
                (self.on_state)(update);
            }
        }
    }

    fn drain_preload(&mut self) {
        let Some(preloader) = self.preloader.as_mut() else {
            return;
        };
        let mut finished = false;
        for event in preloader.drain() {
            match event {
                PreloadEvent::PageMeasured { page, height } => {
                    if !self.geometry.is_measured(page) {
                        self.geometry.record_page_height(page, height);
                    }
                }
                PreloadEvent::Progress { fraction, .. } => {
                    self.preload_fraction = Some(fraction);
                }
                PreloadEvent::Finished => finished = true,
            }
        }
        if finished {
            self.preload_fraction = Some(1.0);
            self.preloader = None;
            log::debug!("preload finished for {}", self.name);
        }
    }

    /// Discrete jump to page `n`. Out-of-range is a silent no-op.
    pub fn navigate_to(&mut self, n: usize, now: Instant) {
        let jump = self
            .nav
            .navigate_to(n, &self.geometry, self.metrics(), now);
        self.perform_jump(jump);
    }

    pub fn navigate_first(&mut self, now: Instant) {
        let jump = self.nav.navigate_first(&self.geometry, self.metrics(), now);
        self.perform_jump(jump);
    }

    pub fn navigate_last(&mut self, now: Instant) {
        let jump = self.nav.navigate_last(&self.geometry, self.metrics(), now);
        self.perform_jump(jump);
    }

    pub fn navigate_next(&mut self, now: Instant) {
        let jump = self.nav.navigate_next(&self.geometry, self.metrics(), now);
        self.perform_jump(jump);
    }

    pub fn navigate_previous(&mut self, now: Instant) {
        let jump = self
            .nav
            .navigate_previous(&self.geometry, self.metrics(), now);
        self.perform_jump(jump);
    }

    fn perform_jump(&mut self, jump: Option<crate::navigation::NavigationJump>) {
        let Some(jump) = jump else { return };
        if self.phase != ReaderPhase::Ready {
            return;
        }

        // Pre-mount the destination window before moving the viewport
        self.window
            .apply(Some(jump.visible), self.geometry.total_pages());
        self.scroll_offset = jump.scroll_to.clamp(0.0, self.max_scroll());

        // Optimistic report: the page number is shown before the
        // scroll visually settles
        if self.scroll.last_page() != Some(jump.page) {
            self.scroll.note_page(jump.page);
            let update = StateUpdate::at_page(jump.page, self.geometry.total_pages())
                .with_progress(
                    self.geometry
                        .progress_percent(self.scroll_offset, self.effective_viewport()),
                );
            (self.on_state)(update);
        }
        // The predictive window stays until the settle tick narrows it
    }

    pub fn zoom_in(&mut self) {
        self.zoom.step_in();
        self.cache.invalidate_all();
        self.scroll.request_tick();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.step_out();
        self.cache.invalidate_all();
        self.scroll.request_tick();
    }

    pub fn set_zoom_percent(&mut self, percent: f32) {
        self.zoom = Zoom::from_percent(percent);
        self.cache.invalidate_all();
        self.scroll.request_tick();
    }

    /// Presentation-only inversion; cached renders stay valid.
    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    /// Render (or fetch from cache) every page in the current window.
    ///
    /// A page that fails to render is skipped (returned with no
    /// content but correct placeholder geometry) and its height falls
    /// back to the estimate so the layout stays consistent.
    pub fn visible_pages(&mut self) -> Vec<VisiblePage> {
        let Some(range) = self.window.visible() else {
            return vec![];
        };
        let Some(source) = self.source.as_mut() else {
            return vec![];
        };

        let mut pages = Vec::with_capacity(range.len());
        for page in range.pages() {
            let top = self.geometry.page_position(page);

            if self.failed_pages.contains(&page) {
                pages.push(VisiblePage {
                    page,
                    top,
                    height: self.geometry.page_height(page),
                    content: None,
                });
                continue;
            }

            let key = CacheKey::new(page, self.zoom.factor());
            let content = match self.cache.get(&key) {
                Some(content) => Some(content),
                None => match render_page(source.as_mut(), page) {
                    Ok(content) => {
                        self.geometry.record_page_height(page, content.height);
                        Some(self.cache.insert(key, content))
                    }
                    Err(error) => {
                        log::warn!("{error}");
                        self.failed_pages.insert(page);
                        if !self.geometry.is_measured(page) {
                            self.geometry.record_page_height(page, ESTIMATED_PAGE_HEIGHT);
                        }
                        None
                    }
                },
            };

            pages.push(VisiblePage {
                page,
                top,
                height: self.geometry.page_height(page),
                content,
            });
        }
        pages
    }
}

fn render_page(source: &mut dyn PdfSource, page: usize) -> Result<PageContent, ReaderError> {
    let (_, height) = source.page_size(page).map_err(|e| ReaderError::PageRender {
        page,
        detail: e.to_string(),
    })?;
    let lines = source.page_text(page).map_err(|e| ReaderError::PageRender {
        page,
        detail: e.to_string(),
    })?;
    Ok(PageContent { lines, height })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::super::source::FakePdfSource;
    use super::*;
    use crate::navigation::SETTLE_DELAY;
    use crate::reader::ReaderSnapshot;

    fn capture() -> (Rc<RefCell<Vec<StateUpdate>>>, StateCallback) {
        let updates: Rc<RefCell<Vec<StateUpdate>>> = Rc::new(RefCell::new(vec![]));
        let sink = updates.clone();
        (updates, Box::new(move |u| sink.borrow_mut().push(u)))
    }

    fn reader_with(
        source: FakePdfSource,
    ) -> (PdfReader, Rc<RefCell<Vec<StateUpdate>>>) {
        let (updates, callback) = capture();
        let reader = PdfReader::from_source("test.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);
        (reader, updates)
    }

    #[test]
    fn load_success_emits_initial_state() {
        let (reader, updates) = reader_with(FakePdfSource::uniform(20, 400.0, 700.0));
        assert_eq!(reader.phase(), ReaderPhase::Ready);

        let mut snapshot = ReaderSnapshot::default();
        for update in updates.borrow().iter() {
            snapshot.apply(update);
        }
        assert_eq!(snapshot.total_pages, 20);
        assert_eq!(snapshot.current_page, 1);
        assert_eq!(snapshot.progress, 0.0);
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn load_failure_is_terminal_and_renders_nothing() {
        let (updates, callback) = capture();
        let mut reader = PdfReader::from_source(
            "broken.pdf",
            Err(ReaderError::PdfLoad {
                detail: "bad xref".into(),
            }),
            100.0,
            800.0,
            callback,
        );

        assert_eq!(reader.phase(), ReaderPhase::Failed);
        let mut snapshot = ReaderSnapshot::default();
        for update in updates.borrow().iter() {
            snapshot.apply(update);
        }
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error.as_deref(), Some("Failed to load PDF document"));

        // No render attempts happen after a load failure
        assert!(reader.visible_pages().is_empty());
        reader.navigate_to(3, Instant::now());
        reader.tick(Instant::now());
        assert!(reader.visible_pages().is_empty());
    }

    #[test]
    fn empty_document_fails_to_load() {
        let (reader, updates) = reader_with(FakePdfSource::uniform(0, 400.0, 700.0));
        assert_eq!(reader.phase(), ReaderPhase::Failed);
        let has_error = updates
            .borrow()
            .iter()
            .any(|u| matches!(u.error, Some(crate::reader::ErrorField::Message(_))));
        assert!(has_error);
    }

    #[test]
    fn only_windowed_pages_are_rendered() {
        let source = FakePdfSource::uniform(500, 400.0, 600.0);
        let render_calls = source.render_calls.clone();
        let (mut reader, _) = reader_with(source);

        let pages = reader.visible_pages();
        assert!(!pages.is_empty());
        assert!(pages.len() <= 15, "window too wide: {}", pages.len());
        assert!(render_calls.load(Ordering::Relaxed) <= 15);
        assert_eq!(pages[0].page, 1);
    }

    #[test]
    fn scrolling_moves_the_window_without_rendering_everything() {
        let source = FakePdfSource::uniform(500, 400.0, 600.0);
        let render_calls = source.render_calls.clone();
        let (mut reader, updates) = reader_with(source);
        reader.visible_pages();

        let target = reader.geometry.page_position(250);
        reader.scroll_to(target);
        reader.tick(Instant::now());
        let pages = reader.visible_pages();

        let range = reader.visible_range().unwrap();
        assert!(range.contains(250), "window {range:?}");
        assert!(range.start >= 245 && range.end <= 255, "window {range:?}");
        assert!(render_calls.load(Ordering::Relaxed) < 100);

        let last = updates.borrow().last().cloned().unwrap();
        assert_eq!(last.current_page, Some(250));
    }

    #[test]
    fn repeated_ticks_at_same_page_emit_once() {
        let (mut reader, updates) = reader_with(FakePdfSource::uniform(100, 400.0, 700.0));
        let baseline = updates.borrow().len();

        for _ in 0..5 {
            reader.scroll_to(10.0);
            reader.tick(Instant::now());
        }
        // Page 1 was already the last reported page: nothing new
        assert_eq!(updates.borrow().len(), baseline);
    }

    #[test]
    fn navigate_last_goes_to_container_end_and_settles() {
        let (mut reader, updates) = reader_with(FakePdfSource::uniform(500, 400.0, 600.0));
        let start = Instant::now();

        reader.navigate_last(start);
        assert!(reader.is_navigating(start));

        let range = reader.visible_range().unwrap();
        assert!(range.contains(500));
        assert!(range.start >= 490);

        let expected = reader.estimated_scroll_height() - 800.0;
        assert!((reader.scroll_offset() - expected).abs() < 0.5);

        let last = updates.borrow().last().cloned().unwrap();
        assert_eq!(last.current_page, Some(500));

        let after = start + SETTLE_DELAY + Duration::from_millis(10);
        reader.tick(after);
        assert!(!reader.is_navigating(after));
    }

    #[test]
    fn out_of_range_navigation_is_ignored() {
        let (mut reader, updates) = reader_with(FakePdfSource::uniform(10, 400.0, 700.0));
        let baseline = updates.borrow().len();
        reader.navigate_to(0, Instant::now());
        reader.navigate_to(11, Instant::now());
        assert_eq!(updates.borrow().len(), baseline);
        assert_eq!(reader.current_page(), 1);
    }

    #[test]
    fn corrupt_page_is_skipped_not_fatal() {
        let source = FakePdfSource::uniform(10, 400.0, 700.0).with_failing_page(2);
        let (mut reader, _) = reader_with(source);

        let pages = reader.visible_pages();
        let page2 = pages.iter().find(|p| p.page == 2).unwrap();
        assert!(page2.content.is_none());
        assert_eq!(page2.height, ESTIMATED_PAGE_HEIGHT);

        let page1 = pages.iter().find(|p| p.page == 1).unwrap();
        assert!(page1.content.is_some());
        assert_eq!(reader.phase(), ReaderPhase::Ready);
    }

    #[test]
    fn rendered_heights_refine_the_geometry() {
        let (mut reader, _) = reader_with(FakePdfSource::uniform(10, 400.0, 700.0));
        reader.visible_pages();
        assert_eq!(reader.geometry.page_height(1), 700.0);
    }

    #[test]
    fn preload_fills_heights_for_large_documents() {
        let source = FakePdfSource::uniform(60, 400.0, 700.0);
        let measure_calls = source.measure_calls.clone();
        let (mut reader, _) = reader_with(source);

        // Wait for the worker to finish, draining each "frame"
        for _ in 0..500 {
            reader.tick(Instant::now());
            if reader.preload_fraction() == Some(1.0) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(reader.preload_fraction(), Some(1.0));
        assert_eq!(measure_calls.load(Ordering::Relaxed), 60);
        assert!(reader.geometry.unmeasured_pages().is_empty());
        assert_eq!(reader.geometry.page_height(59), 700.0);
    }

    #[test]
    fn small_documents_skip_preload() {
        let source = FakePdfSource::uniform(10, 400.0, 700.0);
        let measure_calls = source.measure_calls.clone();
        let (mut reader, _) = reader_with(source);
        reader.tick(Instant::now());
        assert!(reader.preloader.is_none());
        assert_eq!(measure_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn zoom_invalidates_the_render_cache() {
        let source = FakePdfSource::uniform(10, 400.0, 700.0);
        let render_calls = source.render_calls.clone();
        let (mut reader, _) = reader_with(source);

        reader.visible_pages();
        let first_pass = render_calls.load(Ordering::Relaxed);
        reader.visible_pages();
        // Cached: no extra renders
        assert_eq!(render_calls.load(Ordering::Relaxed), first_pass);

        reader.zoom_in();
        reader.visible_pages();
        assert!(render_calls.load(Ordering::Relaxed) > first_pass);
    }
}
