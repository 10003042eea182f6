//! LRU cache for rendered PDF page content

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// Default number of rendered pages kept around.
pub const DEFAULT_CACHE_SIZE: usize = 32;

/// Cache key for rendered pages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number (1-based)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale_millionths: (scale * 1_000_000.0) as u32,
        }
    }
}

/// Rendered content of one page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageContent {
    /// Extracted text lines.
    pub lines: Vec<String>,
    /// Measured page height in document units.
    pub height: f32,
}

/// LRU cache of rendered page content.
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<PageContent>>,
}

impl PageCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached page, promoting it in the LRU order.
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageContent>> {
        self.cache.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    pub fn insert(&mut self, key: CacheKey, content: PageContent) -> Arc<PageContent> {
        let arc = Arc::new(content);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached pages (zoom changed, document refreshed).
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Drop all cached versions of one page.
    pub fn invalidate_page(&mut self, page: usize) {
        let keys_to_remove: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.page == page)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys_to_remove {
            self.cache.pop(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(page: usize) -> PageContent {
        PageContent {
            lines: vec![format!("page {page}")],
            height: 800.0,
        }
    }

    #[test]
    fn insert_and_get() {
        let mut cache = PageCache::new(8);
        let key = CacheKey::new(1, 1.0);
        cache.insert(key.clone(), content(1));
        assert!(cache.contains(&key));
        assert_eq!(cache.get(&key).unwrap().lines, vec!["page 1"]);
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let mut cache = PageCache::new(2);
        for page in 1..=3 {
            cache.insert(CacheKey::new(page, 1.0), content(page));
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::new(1, 1.0)));
        assert!(cache.contains(&CacheKey::new(3, 1.0)));
    }

    #[test]
    fn scale_is_part_of_the_key() {
        let mut cache = PageCache::new(8);
        cache.insert(CacheKey::new(1, 1.0), content(1));
        assert!(!cache.contains(&CacheKey::new(1, 1.1)));
    }

    #[test]
    fn invalidate_page_removes_all_scales() {
        let mut cache = PageCache::new(8);
        cache.insert(CacheKey::new(1, 1.0), content(1));
        cache.insert(CacheKey::new(1, 1.5), content(1));
        cache.insert(CacheKey::new(2, 1.0), content(2));

        cache.invalidate_page(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&CacheKey::new(2, 1.0)));
    }
}
