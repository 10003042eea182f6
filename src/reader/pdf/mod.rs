//! PDF reader adapter
//!
//! The only truly virtualized reader: PDF documents can run to hundreds
//! of fixed-size pages, so only the pages near the viewport are ever
//! rendered. Geometry, window, scroll gating, navigation, preloading
//! and the render cache all meet here.

mod cache;
mod reader;
mod source;
mod zoom;

pub use cache::{CacheKey, PageCache, PageContent, DEFAULT_CACHE_SIZE};
pub use reader::{PdfOptions, PdfReader, VisiblePage};
pub use source::PdfSource;
pub use zoom::Zoom;

#[cfg(feature = "pdf")]
pub use source::MupdfSource;

#[cfg(any(test, feature = "test-utils"))]
pub use source::FakePdfSource;
