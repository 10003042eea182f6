//! Background measurement of page dimensions
//!
//! Large documents would otherwise show a wrong scrollbar until enough
//! pages happen to scroll past, so a worker walks every unmeasured page
//! in fixed batches, feeding heights back to the UI loop over a channel.
//! The walk yields between batches and stops as soon as the owning
//! reader cancels or goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};

use super::ESTIMATED_PAGE_HEIGHT;

/// A page failed to report its native size.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct MeasureError {
    detail: String,
}

impl MeasureError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// The slice of a document handle the preloader needs: native page size
/// at a given scale. Implementations own their document handle; the
/// preloader never shares one with the rendering path.
pub trait PageMeasure: Send {
    fn page_size(&mut self, page: usize, scale: f32) -> Result<(f32, f32), MeasureError>;
}

/// Progress reports from a measurement pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PreloadEvent {
    /// A page's height became known (or fell back to the estimate).
    PageMeasured { page: usize, height: f32 },
    /// Batch boundary: `measured` of `total` pages done.
    Progress {
        measured: usize,
        total: usize,
        fraction: f32,
    },
    /// The pass ran to completion.
    Finished,
}

/// Measure `pages` in batches, reporting through `emit`.
///
/// A measurement failure records the fallback estimate and the pass
/// continues. An empty work list still reports 100% progress without a
/// single measurement call, so running a pass twice is free. Returning
/// `false` from `emit`, or flipping `cancelled`, stops the walk between
/// batches.
pub fn preload_pages(
    source: &mut dyn PageMeasure,
    pages: &[usize],
    scale: f32,
    batch: usize,
    cancelled: &AtomicBool,
    mut emit: impl FnMut(PreloadEvent) -> bool,
) {
    let total = pages.len();
    if total == 0 {
        if emit(PreloadEvent::Progress {
            measured: 0,
            total: 0,
            fraction: 1.0,
        }) {
            emit(PreloadEvent::Finished);
        }
        return;
    }

    let mut measured = 0usize;
    for chunk in pages.chunks(batch.max(1)) {
        if cancelled.load(Ordering::Relaxed) {
            log::debug!("preload cancelled after {measured}/{total} pages");
            return;
        }
        for &page in chunk {
            let height = match source.page_size(page, scale) {
                Ok((_, height)) => height,
                Err(err) => {
                    log::warn!("page {page} failed to measure: {err}");
                    ESTIMATED_PAGE_HEIGHT
                }
            };
            if !emit(PreloadEvent::PageMeasured { page, height }) {
                return;
            }
            measured += 1;
        }
        let keep_going = emit(PreloadEvent::Progress {
            measured,
            total,
            fraction: measured as f32 / total as f32,
        });
        if !keep_going {
            return;
        }
        thread::yield_now();
    }
    emit(PreloadEvent::Finished);
}

/// Handle to a measurement pass running on its own thread.
///
/// Dropping the handle cancels the pass; results produced after the
/// drop go nowhere.
pub struct Preloader {
    rx: Receiver<PreloadEvent>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Preloader {
    /// Start measuring `pages` on a worker thread.
    #[must_use]
    pub fn spawn(
        mut source: Box<dyn PageMeasure>,
        pages: Vec<usize>,
        scale: f32,
        batch: usize,
    ) -> Self {
        let (tx, rx): (Sender<PreloadEvent>, Receiver<PreloadEvent>) = flume::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let handle = thread::spawn(move || {
            preload_pages(source.as_mut(), &pages, scale, batch, &flag, |event| {
                tx.send(event).is_ok()
            });
        });

        Self {
            rx,
            cancelled,
            handle: Some(handle),
        }
    }

    /// Drain events produced since the last call. Non-blocking; meant
    /// to be called once per frame by the owning reader.
    pub fn drain(&mut self) -> Vec<PreloadEvent> {
        let mut events = vec![];
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Drop for Preloader {
    fn drop(&mut self) {
        self.cancel();
        // The worker notices the flag at the next batch boundary (or the
        // closed channel on the next send); no need to block on join.
        drop(self.handle.take());
    }
}
