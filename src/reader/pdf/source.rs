//! Document sources for the PDF reader

use crate::geometry::{MeasureError, PageMeasure};
#[cfg(feature = "pdf")]
use crate::reader::ReaderError;

/// The document-handle surface the reader needs.
///
/// One source is owned by exactly one reader and lives on the UI
/// thread; the preload worker gets its own independent handle via
/// [`PdfSource::measure_handle`], never a shared one.
pub trait PdfSource {
    fn page_count(&self) -> usize;

    fn title(&self) -> Option<String> {
        None
    }

    /// Native page size (width, height) in document units, 1-based page.
    fn page_size(&mut self, page: usize) -> Result<(f32, f32), MeasureError>;

    /// Extracted text lines for a page.
    fn page_text(&mut self, page: usize) -> Result<Vec<String>, MeasureError>;

    /// Independent measurement handle over the same document for the
    /// preload worker thread.
    fn measure_handle(&self) -> Result<Box<dyn PageMeasure>, MeasureError>;
}

#[cfg(feature = "pdf")]
pub use mupdf_source::MupdfSource;

#[cfg(feature = "pdf")]
mod mupdf_source {
    use std::sync::Arc;

    use mupdf::text_page::TextBlockType;
    use mupdf::{Document, TextPageFlags};

    use super::{MeasureError, PageMeasure, PdfSource, ReaderError};

    /// MuPDF-backed source opened from raw document bytes.
    pub struct MupdfSource {
        bytes: Arc<Vec<u8>>,
        doc: Document,
        page_count: usize,
        title: Option<String>,
    }

    impl MupdfSource {
        /// Parse the payload. Failure here is the terminal load error
        /// for the document instance.
        pub fn open(bytes: Vec<u8>) -> Result<Self, ReaderError> {
            let bytes = Arc::new(bytes);
            let doc = Document::from_bytes(&bytes, "application/pdf").map_err(|e| {
                ReaderError::PdfLoad {
                    detail: e.to_string(),
                }
            })?;
            let page_count = doc.page_count().map_err(|e| ReaderError::PdfLoad {
                detail: e.to_string(),
            })? as usize;
            if page_count == 0 {
                return Err(ReaderError::EmptyDocument);
            }
            let title = doc
                .metadata(mupdf::MetadataName::Title)
                .ok()
                .filter(|t| !t.is_empty());

            Ok(Self {
                bytes,
                doc,
                page_count,
                title,
            })
        }
    }

    impl PdfSource for MupdfSource {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn page_size(&mut self, page: usize) -> Result<(f32, f32), MeasureError> {
            measure_page(&self.doc, page)
        }

        fn page_text(&mut self, page: usize) -> Result<Vec<String>, MeasureError> {
            let index = page_index(page, self.page_count)?;
            let loaded = self
                .doc
                .load_page(index)
                .map_err(|e| MeasureError::new(e.to_string()))?;
            let text_page = loaded
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| MeasureError::new(e.to_string()))?;

            let mut lines = vec![];
            for block in text_page.blocks() {
                if block.r#type() != TextBlockType::Text {
                    continue;
                }
                for line in block.lines() {
                    let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                    lines.push(text);
                }
                lines.push(String::new());
            }
            Ok(lines)
        }

        fn measure_handle(&self) -> Result<Box<dyn PageMeasure>, MeasureError> {
            Ok(Box::new(MupdfMeasure {
                bytes: self.bytes.clone(),
                doc: None,
            }))
        }
    }

    /// Measurement handle that opens its own `Document` lazily, inside
    /// the worker thread, since MuPDF contexts must not cross threads.
    struct MupdfMeasure {
        bytes: Arc<Vec<u8>>,
        doc: Option<Document>,
    }

    impl MupdfMeasure {
        fn ensure_open(&mut self) -> Result<&Document, MeasureError> {
            if self.doc.is_none() {
                let doc = Document::from_bytes(&self.bytes, "application/pdf")
                    .map_err(|e| MeasureError::new(e.to_string()))?;
                self.doc = Some(doc);
            }
            Ok(self.doc.as_ref().expect("just opened"))
        }
    }

    impl PageMeasure for MupdfMeasure {
        fn page_size(&mut self, page: usize, scale: f32) -> Result<(f32, f32), MeasureError> {
            let doc = self.ensure_open()?;
            let (width, height) = measure_page(doc, page)?;
            Ok((width * scale, height * scale))
        }
    }

    fn page_index(page: usize, page_count: usize) -> Result<i32, MeasureError> {
        if page == 0 || page > page_count {
            return Err(MeasureError::new(format!("page {page} out of range")));
        }
        Ok((page - 1) as i32)
    }

    fn measure_page(doc: &Document, page: usize) -> Result<(f32, f32), MeasureError> {
        let count = doc
            .page_count()
            .map_err(|e| MeasureError::new(e.to_string()))? as usize;
        let index = page_index(page, count)?;
        let loaded = doc
            .load_page(index)
            .map_err(|e| MeasureError::new(e.to_string()))?;
        let bounds = loaded
            .bounds()
            .map_err(|e| MeasureError::new(e.to_string()))?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakePdfSource;

#[cfg(any(test, feature = "test-utils"))]
mod fake {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{MeasureError, PageMeasure, PdfSource};

    /// Deterministic in-memory source for tests: fixed page sizes,
    /// optional per-page faults, and call counters for asserting that
    /// virtualization really skips unmounted pages.
    pub struct FakePdfSource {
        pub sizes: Vec<(f32, f32)>,
        pub failing_pages: HashSet<usize>,
        pub render_calls: Arc<AtomicUsize>,
        pub measure_calls: Arc<AtomicUsize>,
    }

    impl FakePdfSource {
        #[must_use]
        pub fn uniform(pages: usize, width: f32, height: f32) -> Self {
            Self {
                sizes: vec![(width, height); pages],
                failing_pages: HashSet::new(),
                render_calls: Arc::new(AtomicUsize::new(0)),
                measure_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        #[must_use]
        pub fn with_failing_page(mut self, page: usize) -> Self {
            self.failing_pages.insert(page);
            self
        }

        fn size_of(&self, page: usize) -> Result<(f32, f32), MeasureError> {
            if self.failing_pages.contains(&page) {
                return Err(MeasureError::new(format!("page {page} is corrupt")));
            }
            self.sizes
                .get(page.wrapping_sub(1))
                .copied()
                .ok_or_else(|| MeasureError::new(format!("page {page} out of range")))
        }
    }

    impl PdfSource for FakePdfSource {
        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn title(&self) -> Option<String> {
            Some("fake document".to_string())
        }

        fn page_size(&mut self, page: usize) -> Result<(f32, f32), MeasureError> {
            self.size_of(page)
        }

        fn page_text(&mut self, page: usize) -> Result<Vec<String>, MeasureError> {
            self.render_calls.fetch_add(1, Ordering::Relaxed);
            self.size_of(page)?;
            Ok(vec![format!("content of page {page}")])
        }

        fn measure_handle(&self) -> Result<Box<dyn PageMeasure>, MeasureError> {
            Ok(Box::new(FakeMeasure {
                sizes: self.sizes.clone(),
                failing_pages: self.failing_pages.clone(),
                calls: self.measure_calls.clone(),
            }))
        }
    }

    struct FakeMeasure {
        sizes: Vec<(f32, f32)>,
        failing_pages: HashSet<usize>,
        calls: Arc<AtomicUsize>,
    }

    impl PageMeasure for FakeMeasure {
        fn page_size(&mut self, page: usize, scale: f32) -> Result<(f32, f32), MeasureError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.failing_pages.contains(&page) {
                return Err(MeasureError::new(format!("page {page} is corrupt")));
            }
            let (w, h) = self
                .sizes
                .get(page.wrapping_sub(1))
                .copied()
                .ok_or_else(|| MeasureError::new(format!("page {page} out of range")))?;
            Ok((w * scale, h * scale))
        }
    }
}
