//! Format reader adapters and the host state channel
//!
//! Every adapter follows the same lifecycle, Loading -> Ready ->
//! (Failed | dropped), and reports through the same partial-update
//! callback. Only the PDF adapter virtualizes; EPUB approximates pages
//! by spine item, DOCX and TXT mount their whole converted content and
//! estimate a cosmetic page count.

pub mod docx;
pub mod epub;
pub mod pdf;
pub mod txt;

/// Lifecycle phase of a reader. `Ready` may re-enter itself on a
/// content refresh, but a reader never returns to `Loading` for the
/// same document instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReaderPhase {
    #[default]
    Loading,
    Ready,
    Failed,
}

/// Errors surfaced through the state channel.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Failed to load PDF document")]
    PdfLoad { detail: String },

    #[error("Failed to load EPUB document")]
    EpubLoad { detail: String },

    #[error("Failed to load DOCX document")]
    DocxLoad { detail: String },

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Failed to render page {page}")]
    PageRender { page: usize, detail: String },
}

/// Error slot of a partial update: set a message or clear it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorField {
    Message(String),
    Clear,
}

/// Partial state update sent upward to the host, which merges it into
/// its own display state. Values are clamped before emission: progress
/// to `[0, 100]`, pages to `[1, total]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateUpdate {
    pub current_page: Option<usize>,
    pub total_pages: Option<usize>,
    pub progress: Option<f32>,
    pub is_loading: Option<bool>,
    pub error: Option<ErrorField>,
}

impl StateUpdate {
    /// Load success: full initial state.
    #[must_use]
    pub fn loaded(total_pages: usize) -> Self {
        Self {
            current_page: Some(1),
            total_pages: Some(total_pages),
            progress: Some(0.0),
            is_loading: Some(false),
            error: Some(ErrorField::Clear),
        }
    }

    /// Terminal load failure for this document instance.
    #[must_use]
    pub fn load_failed(error: &ReaderError) -> Self {
        Self {
            is_loading: Some(false),
            error: Some(ErrorField::Message(error.to_string())),
            ..Self::default()
        }
    }

    /// Current-page report, clamped to `[1, total]`.
    #[must_use]
    pub fn at_page(page: usize, total_pages: usize) -> Self {
        Self {
            current_page: Some(page.clamp(1, total_pages.max(1))),
            ..Self::default()
        }
    }

    /// Progress report, clamped to `[0, 100]`.
    #[must_use]
    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress.clamp(0.0, 100.0));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Upward channel from a reader to its host.
pub type StateCallback = Box<dyn FnMut(StateUpdate)>;

/// Merged display state, for hosts (and tests) that want the fold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReaderSnapshot {
    pub current_page: usize,
    pub total_pages: usize,
    pub progress: f32,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ReaderSnapshot {
    pub fn apply(&mut self, update: &StateUpdate) {
        if let Some(page) = update.current_page {
            self.current_page = page;
        }
        if let Some(total) = update.total_pages {
            self.total_pages = total;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(loading) = update.is_loading {
            self.is_loading = loading;
        }
        match &update.error {
            Some(ErrorField::Message(message)) => self.error = Some(message.clone()),
            Some(ErrorField::Clear) => self.error = None,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_update_carries_initial_state() {
        let update = StateUpdate::loaded(320);
        assert_eq!(update.current_page, Some(1));
        assert_eq!(update.total_pages, Some(320));
        assert_eq!(update.progress, Some(0.0));
        assert_eq!(update.is_loading, Some(false));
        assert_eq!(update.error, Some(ErrorField::Clear));
    }

    #[test]
    fn page_and_progress_are_clamped() {
        let update = StateUpdate::at_page(900, 500).with_progress(130.0);
        assert_eq!(update.current_page, Some(500));
        assert_eq!(update.progress, Some(100.0));

        let update = StateUpdate::at_page(0, 500).with_progress(-5.0);
        assert_eq!(update.current_page, Some(1));
        assert_eq!(update.progress, Some(0.0));
    }

    #[test]
    fn snapshot_merges_partials() {
        let mut snapshot = ReaderSnapshot::default();
        snapshot.apply(&StateUpdate::loaded(10));
        snapshot.apply(&StateUpdate::at_page(4, 10).with_progress(33.0));
        assert_eq!(snapshot.current_page, 4);
        assert_eq!(snapshot.total_pages, 10);
        assert_eq!(snapshot.progress, 33.0);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error, None);

        let failure = ReaderError::PdfLoad {
            detail: "bad xref".into(),
        };
        snapshot.apply(&StateUpdate::load_failed(&failure));
        assert_eq!(snapshot.error.as_deref(), Some("Failed to load PDF document"));
        // Fields absent from the partial stay untouched
        assert_eq!(snapshot.current_page, 4);
    }
}
