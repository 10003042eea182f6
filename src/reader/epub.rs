//! EPUB reader adapter
//!
//! "Page" means spine-item index here: an EPUB has no fixed pages, so
//! progress is chapter-grained. Sections are stripped from HTML to
//! plain text with precompiled regexes; one section is mounted at a
//! time.

use std::io::Cursor;

use epub::doc::EpubDoc;
use regex::Regex;

use super::{ReaderError, ReaderPhase, StateCallback, StateUpdate};

struct StripPatterns {
    p_open: Regex,
    heading_open: Regex,
    heading_close: Regex,
    br: Regex,
    remaining_tags: Regex,
    multi_newline: Regex,
}

impl StripPatterns {
    fn new() -> Self {
        Self {
            p_open: Regex::new(r"<p[^>]*>").expect("Failed to compile paragraph tag regex"),
            heading_open: Regex::new(r"<h[1-6][^>]*>")
                .expect("Failed to compile header open tag regex"),
            heading_close: Regex::new(r"</h[1-6]>")
                .expect("Failed to compile header close tag regex"),
            br: Regex::new(r"<br[^>]*>").expect("Failed to compile br tag regex"),
            remaining_tags: Regex::new(r"<[^>]*>").expect("Failed to compile remaining tags regex"),
            multi_newline: Regex::new(r"\n{3,}").expect("Failed to compile multi newline regex"),
        }
    }

    fn strip(&self, html: &str) -> String {
        let text = self.p_open.replace_all(html, "\n\n");
        let text = self.heading_open.replace_all(&text, "\n\n");
        let text = self.heading_close.replace_all(&text, "\n\n");
        let text = self.br.replace_all(&text, "\n");
        let text = self.remaining_tags.replace_all(&text, "");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");
        let text = self.multi_newline.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

/// Spine-indexed EPUB reader over an in-memory payload.
pub struct EpubReader {
    phase: ReaderPhase,
    doc: Option<EpubDoc<Cursor<Vec<u8>>>>,
    patterns: StripPatterns,
    title: Option<String>,
    section: usize,
    total_sections: usize,
    lines: Vec<String>,
    on_state: StateCallback,
}

impl EpubReader {
    /// Parse the payload and load the first spine section.
    pub fn open(bytes: Vec<u8>, mut on_state: StateCallback) -> Self {
        on_state(StateUpdate {
            is_loading: Some(true),
            ..StateUpdate::default()
        });

        let patterns = StripPatterns::new();
        match EpubDoc::from_reader(Cursor::new(bytes)) {
            Err(err) => {
                let error = ReaderError::EpubLoad {
                    detail: err.to_string(),
                };
                log::error!("epub load failed: {error}: {err}");
                on_state(StateUpdate::load_failed(&error));
                Self {
                    phase: ReaderPhase::Failed,
                    doc: None,
                    patterns,
                    title: None,
                    section: 0,
                    total_sections: 0,
                    lines: vec![],
                    on_state,
                }
            }
            Ok(doc) => {
                let total_sections = doc.get_num_pages();
                let title = doc.mdata("title").map(|m| m.value.clone());
                on_state(StateUpdate::loaded(total_sections));
                log::info!("epub ready: {total_sections} sections");

                let mut reader = Self {
                    phase: ReaderPhase::Ready,
                    doc: Some(doc),
                    patterns,
                    title,
                    section: 1,
                    total_sections,
                    lines: vec![],
                    on_state,
                };
                reader.load_current_section();
                reader
            }
        }
    }

    #[must_use]
    pub fn phase(&self) -> ReaderPhase {
        self.phase
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Current spine item, 1-based.
    #[must_use]
    pub fn current_section(&self) -> usize {
        self.section
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.total_sections
    }

    /// Stripped text of the mounted section.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn next_section(&mut self) {
        self.go_to_section(self.section + 1);
    }

    pub fn previous_section(&mut self) {
        if self.section > 1 {
            self.go_to_section(self.section - 1);
        }
    }

    pub fn first_section(&mut self) {
        self.go_to_section(1);
    }

    pub fn last_section(&mut self) {
        self.go_to_section(self.total_sections);
    }

    /// Jump to a spine item; out-of-range is a silent no-op.
    pub fn go_to_section(&mut self, section: usize) {
        if self.phase != ReaderPhase::Ready
            || section == 0
            || section > self.total_sections
            || section == self.section
        {
            return;
        }
        let Some(doc) = self.doc.as_mut() else { return };
        if !doc.set_current_page(section - 1) {
            log::warn!("failed to open spine item {section}");
            return;
        }
        self.section = section;
        self.load_current_section();
    }

    /// Coarse progress: position within the spine.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.total_sections <= 1 {
            return 100.0;
        }
        ((self.section - 1) as f32 / (self.total_sections - 1) as f32 * 100.0).clamp(0.0, 100.0)
    }

    fn load_current_section(&mut self) {
        let Some(doc) = self.doc.as_mut() else { return };
        let content = match doc.get_current_str() {
            Some((html, _mime)) => self.patterns.strip(&html),
            None => {
                log::warn!("spine item {} has no content", self.section);
                String::new()
            }
        };
        self.lines = content.lines().map(str::to_string).collect();

        let update = StateUpdate::at_page(self.section, self.total_sections)
            .with_progress(self.progress());
        (self.on_state)(update);
    }
}
