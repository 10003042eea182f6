//! End-to-end reader scenarios against a deterministic page source.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use folio::geometry::{preload_pages, PageGeometry, PageMeasure, PreloadEvent};
use folio::input::{pinch_zoom, Gesture, GestureRecognizer, TouchPoint, ZoomIntent};
use folio::navigation::SETTLE_DELAY;
use folio::reader::pdf::{FakePdfSource, PdfReader};
use folio::reader::{ReaderError, ReaderSnapshot, StateUpdate};

fn capture() -> (
    Rc<RefCell<Vec<StateUpdate>>>,
    Box<dyn FnMut(StateUpdate)>,
) {
    let updates: Rc<RefCell<Vec<StateUpdate>>> = Rc::new(RefCell::new(vec![]));
    let sink = updates.clone();
    (updates, Box::new(move |u| sink.borrow_mut().push(u)))
}

fn merged(updates: &Rc<RefCell<Vec<StateUpdate>>>) -> ReaderSnapshot {
    let mut snapshot = ReaderSnapshot::default();
    for update in updates.borrow().iter() {
        snapshot.apply(update);
    }
    snapshot
}

#[test]
fn five_hundred_page_document_stays_windowed() {
    let source = FakePdfSource::uniform(500, 400.0, 600.0);
    let render_calls = source.render_calls.clone();
    let (updates, callback) = capture();
    let mut reader =
        PdfReader::from_source("big.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    let snapshot = merged(&updates);
    assert_eq!(snapshot.total_pages, 500);
    assert_eq!(snapshot.current_page, 1);
    assert!(!snapshot.is_loading);

    // Initial window: first page plus a small buffer
    let range = reader.visible_range().expect("window after load");
    assert_eq!(range.start, 1);
    assert!(range.end <= 15, "initial window {range:?}");

    // Scroll to the middle of the document
    let offset_for_250 = reader.estimated_scroll_height() / 500.0 * 249.0;
    reader.scroll_to(offset_for_250);
    reader.tick(Instant::now());

    let range = reader.visible_range().expect("window after scroll");
    assert!(range.contains(250), "window {range:?} misses page 250");
    assert!(
        range.start >= 245 && range.end <= 255,
        "window {range:?} is not tight around page 250"
    );

    // Virtualization held: nowhere near 500 renders happened
    reader.visible_pages();
    assert!(render_calls.load(Ordering::Relaxed) < 50);
    assert_eq!(merged(&updates).current_page, 250);
}

#[test]
fn navigate_to_last_page_widens_then_settles() {
    let source = FakePdfSource::uniform(500, 400.0, 600.0);
    let (updates, callback) = capture();
    let mut reader =
        PdfReader::from_source("big.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    let start = Instant::now();
    reader.navigate_last(start);

    // Navigating flag set, destination pre-mounted
    assert!(reader.is_navigating(start));
    let range = reader.visible_range().expect("predictive window");
    assert!(range.contains(500));
    assert!(range.start >= 485, "window {range:?} too wide");

    // The jump targets the true container end, not the estimated
    // position of the last page
    let expected = reader.estimated_scroll_height() - 800.0;
    assert!((reader.scroll_offset() - expected).abs() < 0.5);

    // Optimistic report arrived before any settle
    assert_eq!(merged(&updates).current_page, 500);
    assert!((merged(&updates).progress - 100.0).abs() < 0.5);

    // Settle delay clears the flag
    let after = start + SETTLE_DELAY + Duration::from_millis(5);
    reader.tick(after);
    assert!(!reader.is_navigating(after));
}

#[test]
fn out_of_range_navigation_is_a_silent_no_op() {
    let source = FakePdfSource::uniform(10, 400.0, 600.0);
    let (updates, callback) = capture();
    let mut reader =
        PdfReader::from_source("small.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    let before = updates.borrow().len();
    reader.navigate_to(0, Instant::now());
    reader.navigate_to(9_999, Instant::now());
    assert_eq!(updates.borrow().len(), before);
    assert_eq!(merged(&updates).current_page, 1);
}

#[test]
fn load_failure_surfaces_error_and_never_renders() {
    let (updates, callback) = capture();
    let mut reader = PdfReader::from_source(
        "broken.pdf",
        Err(ReaderError::PdfLoad {
            detail: "truncated xref table".into(),
        }),
        100.0,
        800.0,
        callback,
    );

    let snapshot = merged(&updates);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.error.as_deref(), Some("Failed to load PDF document"));

    reader.scroll_to(5_000.0);
    reader.tick(Instant::now());
    reader.navigate_to(7, Instant::now());
    assert!(reader.visible_pages().is_empty());
}

#[test]
fn corrupt_interior_page_degrades_to_placeholder() {
    let source = FakePdfSource::uniform(10, 400.0, 600.0).with_failing_page(3);
    let (updates, callback) = capture();
    let mut reader =
        PdfReader::from_source("mixed.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    let pages = reader.visible_pages();
    let broken = pages.iter().find(|p| p.page == 3).expect("page 3 in window");
    assert!(broken.content.is_none());
    assert!(broken.height > 0.0);

    // The document as a whole stays readable
    assert!(pages.iter().any(|p| p.content.is_some()));
    assert!(merged(&updates).error.is_none());
}

#[test]
fn preload_converges_heights_for_large_documents() {
    let source = FakePdfSource::uniform(80, 400.0, 720.0);
    let measure_calls = source.measure_calls.clone();
    let (_, callback) = capture();
    let mut reader =
        PdfReader::from_source("long.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    for _ in 0..1_000 {
        reader.tick(Instant::now());
        if reader.preload_fraction() == Some(1.0) {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(reader.preload_fraction(), Some(1.0));
    assert_eq!(measure_calls.load(Ordering::Relaxed), 80);
    // The container height now reflects the measured 720-unit pages
    let per_page = reader.estimated_scroll_height() / 80.0;
    assert!((per_page - 736.0).abs() < 1.0, "stride {per_page}");
}

struct CountingMeasure {
    calls: usize,
}

impl PageMeasure for CountingMeasure {
    fn page_size(
        &mut self,
        _page: usize,
        scale: f32,
    ) -> Result<(f32, f32), folio::geometry::MeasureError> {
        self.calls += 1;
        Ok((400.0 * scale, 650.0 * scale))
    }
}

#[test]
fn preload_pass_is_idempotent() {
    let mut geometry = PageGeometry::new(30);
    let mut measure = CountingMeasure { calls: 0 };
    let cancelled = AtomicBool::new(false);

    let run = |geometry: &mut PageGeometry,
               measure: &mut CountingMeasure,
               cancelled: &AtomicBool| {
        let mut events = vec![];
        let pages = geometry.unmeasured_pages();
        preload_pages(measure, &pages, 1.0, 10, cancelled, |e| {
            events.push(e.clone());
            if let PreloadEvent::PageMeasured { page, height } = e {
                geometry.record_page_height(page, height);
            }
            true
        });
        events
    };

    let first = run(&mut geometry, &mut measure, &cancelled);
    assert_eq!(measure.calls, 30);
    assert_eq!(first.last(), Some(&PreloadEvent::Finished));

    // Second pass: all heights known, zero measurement calls, still a
    // complete progress report
    let second = run(&mut geometry, &mut measure, &cancelled);
    assert_eq!(measure.calls, 30);
    assert!(second.contains(&PreloadEvent::Progress {
        measured: 0,
        total: 0,
        fraction: 1.0,
    }));
    assert_eq!(second.last(), Some(&PreloadEvent::Finished));
}

#[test]
fn pinch_gesture_drives_zoom() {
    let base = Instant::now();
    let mut gestures = GestureRecognizer::new();

    gestures.touch_start(
        &[TouchPoint::new(0.0, 0.0), TouchPoint::new(100.0, 0.0)],
        base,
    );
    let update = gestures.touch_move(
        &[TouchPoint::new(0.0, 0.0), TouchPoint::new(130.0, 0.0)],
        base + Duration::from_millis(80),
    );
    assert_eq!(update, Some(Gesture::PinchUpdate { scale: 1.3 }));

    let end = gestures.touch_end(base + Duration::from_millis(160));
    let Some(Gesture::PinchEnd { scale }) = end else {
        panic!("expected a pinch end, got {end:?}");
    };
    assert_eq!(pinch_zoom(scale), Some(ZoomIntent::In));

    // Feed the intent to a reader
    let source = FakePdfSource::uniform(10, 400.0, 600.0);
    let (_, callback) = capture();
    let mut reader =
        PdfReader::from_source("zoomed.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);
    reader.zoom_in();
    assert!(reader.zoom().factor() > 1.0);
}

#[test]
fn scroll_page_reports_deduplicate_across_ticks() {
    let source = FakePdfSource::uniform(100, 400.0, 600.0);
    let (updates, callback) = capture();
    let mut reader =
        PdfReader::from_source("dedup.pdf", Ok(Box::new(source)), 100.0, 800.0, callback);

    let baseline = updates.borrow().len();
    // Many small scrolls within page 1
    for offset in [5.0, 10.0, 15.0, 20.0] {
        reader.scroll_to(offset);
        reader.tick(Instant::now());
    }
    assert_eq!(updates.borrow().len(), baseline);

    // One real page change: exactly one report
    reader.scroll_to(reader.estimated_scroll_height() / 100.0 * 10.0);
    reader.tick(Instant::now());
    assert_eq!(updates.borrow().len(), baseline + 1);
}
