//! DOCX reader adapter
//!
//! A DOCX payload is a zip containing `word/document.xml`; paragraphs
//! come from the `w:p`/`w:t` runs. The whole converted document is
//! mounted at once, with no virtualization, and the page count is a
//! display-only estimate from the character count.

use std::io::{Cursor, Read};

use super::{ReaderError, ReaderPhase, StateCallback, StateUpdate};

/// Assumed characters per page for the cosmetic page estimate.
pub const DOCX_CHARS_PER_PAGE: usize = 1800;

/// Whole-document DOCX reader.
pub struct DocxReader {
    phase: ReaderPhase,
    paragraphs: Vec<String>,
    char_count: usize,
    last_reported_page: usize,
    on_state: StateCallback,
}

impl DocxReader {
    /// Unpack and convert the payload.
    pub fn open(bytes: &[u8], mut on_state: StateCallback) -> Self {
        on_state(StateUpdate {
            is_loading: Some(true),
            ..StateUpdate::default()
        });

        match extract_paragraphs(bytes) {
            Err(error) => {
                log::error!("docx load failed: {error}");
                on_state(StateUpdate::load_failed(&error));
                Self {
                    phase: ReaderPhase::Failed,
                    paragraphs: vec![],
                    char_count: 0,
                    last_reported_page: 0,
                    on_state,
                }
            }
            Ok(paragraphs) => {
                let char_count = paragraphs.iter().map(|p| p.chars().count()).sum();
                let mut reader = Self {
                    phase: ReaderPhase::Ready,
                    paragraphs,
                    char_count,
                    last_reported_page: 1,
                    on_state,
                };
                let estimated_pages = reader.estimated_pages();
                (reader.on_state)(StateUpdate::loaded(estimated_pages));
                log::info!(
                    "docx ready: {} paragraphs, ~{} pages",
                    reader.paragraphs.len(),
                    reader.estimated_pages()
                );
                reader
            }
        }
    }

    /// Re-parse a replacement payload in place. Ready re-enters Ready;
    /// a conversion failure keeps the previous content and surfaces the
    /// error without killing the instance.
    pub fn refresh(&mut self, bytes: &[u8]) {
        if self.phase != ReaderPhase::Ready {
            return;
        }
        match extract_paragraphs(bytes) {
            Err(error) => {
                log::warn!("docx refresh failed: {error}");
                (self.on_state)(StateUpdate {
                    error: Some(super::ErrorField::Message(error.to_string())),
                    ..StateUpdate::default()
                });
            }
            Ok(paragraphs) => {
                self.char_count = paragraphs.iter().map(|p| p.chars().count()).sum();
                self.paragraphs = paragraphs;
                self.last_reported_page = 1;
                let estimated_pages = self.estimated_pages();
                (self.on_state)(StateUpdate::loaded(estimated_pages));
            }
        }
    }

    #[must_use]
    pub fn phase(&self) -> ReaderPhase {
        self.phase
    }

    #[must_use]
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// Display-only page estimate; the content is one flowed column.
    #[must_use]
    pub fn estimated_pages(&self) -> usize {
        self.char_count.div_ceil(DOCX_CHARS_PER_PAGE).max(1)
    }

    /// Report the page corresponding to a scroll fraction in `[0, 1]`,
    /// deduplicated like any other scroll-driven page report.
    pub fn report_scroll(&mut self, fraction: f32) {
        if self.phase != ReaderPhase::Ready {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let total = self.estimated_pages();
        let page = ((fraction * total as f32).ceil() as usize).clamp(1, total);
        if page != self.last_reported_page {
            self.last_reported_page = page;
            (self.on_state)(StateUpdate::at_page(page, total).with_progress(fraction * 100.0));
        }
    }
}

fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ReaderError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ReaderError::DocxLoad {
            detail: e.to_string(),
        })?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ReaderError::DocxLoad {
            detail: e.to_string(),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| ReaderError::DocxLoad {
            detail: e.to_string(),
        })?;

    let doc = roxmltree::Document::parse(&xml).map_err(|e| ReaderError::DocxLoad {
        detail: e.to_string(),
    })?;

    let mut paragraphs = vec![];
    for node in doc.descendants().filter(|n| n.tag_name().name() == "p") {
        let mut text = String::new();
        for run in node.descendants() {
            match run.tag_name().name() {
                "t" => text.push_str(run.text().unwrap_or_default()),
                "br" | "cr" => text.push('\n'),
                "tab" => text.push('\t'),
                _ => {}
            }
        }
        paragraphs.push(text);
    }
    Ok(paragraphs)
}
