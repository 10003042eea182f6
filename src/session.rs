//! Reading session records
//!
//! One record per (user, book): cumulative reading seconds, last-read
//! timestamp, active flag, last page. The tracker calls start/tick/end
//! at the right moments; persistence sits behind a trait because the
//! store is an external collaborator; the bundled implementation is a
//! JSON file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often an open reader reports accumulated reading time.
pub const SESSION_TICK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: String,
    pub book: String,
    pub reading_seconds: u64,
    pub last_read: DateTime<Utc>,
    pub active: bool,
    #[serde(default)]
    pub last_page: usize,
}

/// External persistence for session records.
pub trait SessionStore {
    /// Mark a session active; creates the record on first open.
    fn start_session(&mut self, user: &str, book: &str);

    /// Add reading time and the current page to the record.
    fn tick_session(&mut self, user: &str, book: &str, elapsed_seconds: u64, page: usize);

    /// Close the session, clearing the active flag.
    fn end_session(&mut self, user: &str, book: &str);

    /// Last page recorded for the book, for position restore.
    fn last_page(&self, user: &str, book: &str) -> Option<usize>;
}

fn record_key(user: &str, book: &str) -> String {
    format!("{user}\u{1f}{book}")
}

/// JSON-file session store.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSessionStore {
    sessions: HashMap<String, SessionRecord>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl JsonSessionStore {
    pub fn ephemeral() -> Self {
        Self {
            sessions: HashMap::new(),
            file_path: None,
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load sessions from {}: {e}", path.display());
                Self {
                    sessions: HashMap::new(),
                    file_path: Some(path.to_path_buf()),
                }
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if file_path.exists() {
            let content = fs::read_to_string(file_path)?;
            let mut store: Self = serde_json::from_str(&content)?;
            store.file_path = Some(file_path.to_path_buf());
            Ok(store)
        } else {
            Ok(Self {
                sessions: HashMap::new(),
                file_path: Some(file_path.to_path_buf()),
            })
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.file_path {
            let content = serde_json::to_string_pretty(self)?;
            fs::write(path, content)?;
        }
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save sessions: {e}");
        }
    }

    #[must_use]
    pub fn record(&self, user: &str, book: &str) -> Option<&SessionRecord> {
        self.sessions.get(&record_key(user, book))
    }

    /// Most recently read books, newest first.
    #[must_use]
    pub fn history(&self) -> Vec<&SessionRecord> {
        let mut records: Vec<&SessionRecord> = self.sessions.values().collect();
        records.sort_by(|a, b| b.last_read.cmp(&a.last_read));
        records
    }
}

impl SessionStore for JsonSessionStore {
    fn start_session(&mut self, user: &str, book: &str) {
        let record = self
            .sessions
            .entry(record_key(user, book))
            .or_insert_with(|| SessionRecord {
                user: user.to_string(),
                book: book.to_string(),
                reading_seconds: 0,
                last_read: Utc::now(),
                active: false,
                last_page: 1,
            });
        record.active = true;
        record.last_read = Utc::now();
        self.save_logged();
    }

    fn tick_session(&mut self, user: &str, book: &str, elapsed_seconds: u64, page: usize) {
        if let Some(record) = self.sessions.get_mut(&record_key(user, book)) {
            record.reading_seconds += elapsed_seconds;
            record.last_read = Utc::now();
            record.last_page = page;
            self.save_logged();
        }
    }

    fn end_session(&mut self, user: &str, book: &str) {
        if let Some(record) = self.sessions.get_mut(&record_key(user, book)) {
            record.active = false;
            record.last_read = Utc::now();
            self.save_logged();
        }
    }

    fn last_page(&self, user: &str, book: &str) -> Option<usize> {
        self.record(user, book).map(|r| r.last_page)
    }
}

/// Drives start/tick/end against a store while a reader is mounted.
///
/// Clock values come from the caller, so ticking is deterministic in
/// tests and stops naturally when the reader stops calling in.
pub struct SessionTracker {
    user: String,
    book: String,
    interval: Duration,
    last_tick: Option<Instant>,
}

impl SessionTracker {
    #[must_use]
    pub fn new(user: impl Into<String>, book: impl Into<String>, interval: Duration) -> Self {
        Self {
            user: user.into(),
            book: book.into(),
            interval,
            last_tick: None,
        }
    }

    /// Open the session (first page-open).
    pub fn begin(&mut self, store: &mut dyn SessionStore, now: Instant) {
        store.start_session(&self.user, &self.book);
        self.last_tick = Some(now);
    }

    /// Report accumulated time if the tick interval elapsed. Returns
    /// whether a tick was recorded.
    pub fn maybe_tick(&mut self, store: &mut dyn SessionStore, now: Instant, page: usize) -> bool {
        let Some(last) = self.last_tick else {
            return false;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return false;
        }
        store.tick_session(&self.user, &self.book, elapsed.as_secs(), page);
        self.last_tick = Some(now);
        true
    }

    /// Close the session (reader unmount), flushing the residual time.
    pub fn finish(&mut self, store: &mut dyn SessionStore, now: Instant, page: usize) {
        if let Some(last) = self.last_tick.take() {
            let elapsed = now.saturating_duration_since(last);
            if elapsed.as_secs() > 0 {
                store.tick_session(&self.user, &self.book, elapsed.as_secs(), page);
            }
        }
        store.end_session(&self.user, &self.book);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifecycle_accumulates_time() {
        let mut store = JsonSessionStore::ephemeral();
        let mut tracker = SessionTracker::new("reader", "book.pdf", Duration::from_secs(30));
        let start = Instant::now();

        tracker.begin(&mut store, start);
        assert!(store.record("reader", "book.pdf").unwrap().active);

        // Before the interval: no tick
        assert!(!tracker.maybe_tick(&mut store, start + Duration::from_secs(10), 3));
        assert_eq!(store.record("reader", "book.pdf").unwrap().reading_seconds, 0);

        assert!(tracker.maybe_tick(&mut store, start + Duration::from_secs(35), 5));
        let record = store.record("reader", "book.pdf").unwrap();
        assert_eq!(record.reading_seconds, 35);
        assert_eq!(record.last_page, 5);

        tracker.finish(&mut store, start + Duration::from_secs(50), 7);
        let record = store.record("reader", "book.pdf").unwrap();
        assert!(!record.active);
        assert_eq!(record.reading_seconds, 50);
        assert_eq!(record.last_page, 7);
    }

    #[test]
    fn reopening_keeps_cumulative_seconds() {
        let mut store = JsonSessionStore::ephemeral();
        let mut tracker = SessionTracker::new("reader", "book.pdf", Duration::from_secs(30));
        let start = Instant::now();
        tracker.begin(&mut store, start);
        tracker.finish(&mut store, start + Duration::from_secs(40), 2);

        let mut tracker = SessionTracker::new("reader", "book.pdf", Duration::from_secs(30));
        tracker.begin(&mut store, start);
        tracker.finish(&mut store, start + Duration::from_secs(20), 4);

        let record = store.record("reader", "book.pdf").unwrap();
        assert_eq!(record.reading_seconds, 60);
        assert_eq!(record.last_page, 4);
    }

    #[test]
    fn last_page_restores_position() {
        let mut store = JsonSessionStore::ephemeral();
        assert_eq!(store.last_page("reader", "book.pdf"), None);

        let mut tracker = SessionTracker::new("reader", "book.pdf", Duration::ZERO);
        let start = Instant::now();
        tracker.begin(&mut store, start);
        tracker.maybe_tick(&mut store, start + Duration::from_secs(1), 42);
        assert_eq!(store.last_page("reader", "book.pdf"), Some(42));
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        {
            let mut store = JsonSessionStore::load_or_ephemeral(Some(&path));
            store.start_session("reader", "book.epub");
            store.tick_session("reader", "book.epub", 90, 12);
            store.end_session("reader", "book.epub");
        }

        let store = JsonSessionStore::load_or_ephemeral(Some(&path));
        let record = store.record("reader", "book.epub").unwrap();
        assert_eq!(record.reading_seconds, 90);
        assert_eq!(record.last_page, 12);
        assert!(!record.active);
    }

    #[test]
    fn history_is_newest_first() {
        let mut store = JsonSessionStore::ephemeral();
        store.start_session("reader", "first.epub");
        store.start_session("reader", "second.epub");
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].last_read >= history[1].last_read);
    }
}
