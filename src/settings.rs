//! User configuration
//!
//! Loaded from `config.yaml` under the platform config directory.
//! Every field has a serde default so old or partial config files keep
//! working.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Default zoom for PDF documents, percent (100 = baseline).
    #[serde(default = "default_zoom_percent")]
    pub default_zoom_percent: f32,

    /// Fraction of the container width given to page content.
    #[serde(default = "default_margin_ratio")]
    pub margin_ratio: f32,

    /// Extra pages mounted on each side during ordinary scroll.
    #[serde(default = "default_scroll_buffer")]
    pub scroll_buffer: usize,

    /// Widened buffer while a navigation jump is settling.
    #[serde(default = "default_nav_buffer")]
    pub nav_buffer: usize,

    /// Page count above which the preload pass runs.
    #[serde(default = "default_preload_min_pages")]
    pub preload_min_pages: usize,

    /// Pages measured per preload batch.
    #[serde(default = "default_preload_batch")]
    pub preload_batch: usize,

    /// Seconds between reading-session ticks.
    #[serde(default = "default_session_tick_seconds")]
    pub session_tick_seconds: u64,

    /// User name recorded on session records.
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_zoom_percent() -> f32 {
    100.0
}

fn default_margin_ratio() -> f32 {
    0.9
}

fn default_scroll_buffer() -> usize {
    crate::geometry::DEFAULT_SCROLL_BUFFER
}

fn default_nav_buffer() -> usize {
    crate::geometry::DEFAULT_NAV_BUFFER
}

fn default_preload_min_pages() -> usize {
    crate::geometry::PRELOAD_MIN_PAGES
}

fn default_preload_batch() -> usize {
    crate::geometry::PRELOAD_BATCH
}

fn default_session_tick_seconds() -> u64 {
    30
}

fn default_user() -> String {
    "reader".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_zoom_percent: default_zoom_percent(),
            margin_ratio: default_margin_ratio(),
            scroll_buffer: default_scroll_buffer(),
            nav_buffer: default_nav_buffer(),
            preload_min_pages: default_preload_min_pages(),
            preload_batch: default_preload_batch(),
            session_tick_seconds: default_session_tick_seconds(),
            user: default_user(),
        }
    }
}

/// Default config file location.
#[must_use]
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Default session store location.
#[must_use]
pub fn sessions_path() -> Option<PathBuf> {
    dirs::data_dir().map(|data| data.join(APP_NAME).join("sessions.json"))
}

impl Settings {
    /// Load the config file, falling back to defaults on any problem.
    #[must_use]
    pub fn load(path: Option<&std::path::Path>) -> Self {
        let Some(path) = path.map(PathBuf::from).or_else(settings_path) else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Invalid settings in {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}
