//! Plain-text reader adapter
//!
//! The entire text is one flowed column; pages are purely cosmetic,
//! estimated from the word count.

use super::{ReaderPhase, StateCallback, StateUpdate};

/// Assumed words per page for the cosmetic page estimate.
pub const TXT_WORDS_PER_PAGE: usize = 400;

/// Whole-document plain-text reader.
pub struct TxtReader {
    text: String,
    word_count: usize,
    last_reported_page: usize,
    on_state: StateCallback,
}

impl TxtReader {
    /// Text payloads cannot fail to parse; the reader goes straight to
    /// Ready.
    pub fn open(text: String, mut on_state: StateCallback) -> Self {
        on_state(StateUpdate {
            is_loading: Some(true),
            ..StateUpdate::default()
        });

        let word_count = text.split_whitespace().count();
        let mut reader = Self {
            text,
            word_count,
            last_reported_page: 1,
            on_state,
        };
        let estimated_pages = reader.estimated_pages();
        (reader.on_state)(StateUpdate::loaded(estimated_pages));
        log::info!(
            "txt ready: {} words, ~{} pages",
            reader.word_count,
            reader.estimated_pages()
        );
        reader
    }

    #[must_use]
    pub fn phase(&self) -> ReaderPhase {
        ReaderPhase::Ready
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Display-only page estimate.
    #[must_use]
    pub fn estimated_pages(&self) -> usize {
        self.word_count.div_ceil(TXT_WORDS_PER_PAGE).max(1)
    }

    /// Flow the text to a column width for display.
    #[must_use]
    pub fn wrapped_lines(&self, width: usize) -> Vec<String> {
        let width = width.max(1);
        let mut lines = vec![];
        for paragraph in self.text.lines() {
            if paragraph.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(textwrap::wrap(paragraph, width).into_iter().map(String::from));
            }
        }
        lines
    }

    /// Report the page for a scroll fraction in `[0, 1]`, deduplicated.
    pub fn report_scroll(&mut self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let total = self.estimated_pages();
        let page = ((fraction * total as f32).ceil() as usize).clamp(1, total);
        if page != self.last_reported_page {
            self.last_reported_page = page;
            (self.on_state)(StateUpdate::at_page(page, total).with_progress(fraction * 100.0));
        }
    }
}
