//! Memoized completion lists keyed by package name or file path.
//! （以套件名稱或檔案路徑為鍵的補全清單快取。）

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::completion::Completion;

#[derive(Debug, Clone)]
struct CacheEntry {
    completions: Arc<Vec<Completion>>,
    stored_at: Instant,
}

/// A hit returns the very list stored earlier; entries only leave through
/// [`CompletionCache::invalidate`] or, when configured, by ageing out.
#[derive(Debug, Clone, Default)]
pub struct CompletionCache {
    entries: HashMap<String, CacheEntry>,
    max_age: Option<Duration>,
}

impl CompletionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            max_age,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<Completion>>> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<Arc<Vec<Completion>>> {
        let entry = self.entries.get(key)?;
        if let Some(max_age) = self.max_age {
            if now.saturating_duration_since(entry.stored_at) >= max_age {
                return None;
            }
        }
        Some(Arc::clone(&entry.completions))
    }

    pub fn insert(&mut self, key: impl Into<String>, completions: Vec<Completion>) -> Arc<Vec<Completion>> {
        self.insert_at(key, completions, Instant::now())
    }

    pub fn insert_at(
        &mut self,
        key: impl Into<String>,
        completions: Vec<Completion>,
        now: Instant,
    ) -> Arc<Vec<Completion>> {
        let completions = Arc::new(completions);
        self.entries.insert(
            key.into(),
            CacheEntry {
                completions: Arc::clone(&completions),
                stored_at: now,
            },
        );
        completions
    }

    /// Returns the cached list for `key`, computing and storing it on a miss.
    /// （命中時回傳快取清單，否則計算後存入。）
    pub fn get_or_compute<F>(&mut self, key: &str, compute: F) -> Arc<Vec<Completion>>
    where
        F: FnOnce() -> Vec<Completion>,
    {
        self.get_or_compute_at(key, Instant::now(), compute)
    }

    pub fn get_or_compute_at<F>(&mut self, key: &str, now: Instant, compute: F) -> Arc<Vec<Completion>>
    where
        F: FnOnce() -> Vec<Completion>,
    {
        if let Some(hit) = self.get_at(key, now) {
            trace!(key, "completion cache hit");
            return hit;
        }
        trace!(key, "completion cache miss");
        self.insert_at(key, compute(), now)
    }

    /// Drops the entry for `key`; returns whether one existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::constant_completion;

    #[test]
    fn hit_returns_the_stored_list() {
        let mut cache = CompletionCache::new();
        let first = cache.get_or_compute("fmt", || vec![constant_completion("A", "fmt")]);
        let second = cache.get_or_compute("fmt", || panic!("must not recompute"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidation_forces_recompute() {
        let mut cache = CompletionCache::new();
        cache.insert("game", vec![constant_completion("OLD", "game")]);
        assert!(cache.invalidate("game"));
        assert!(!cache.invalidate("game"));
        let fresh = cache.get_or_compute("game", || vec![constant_completion("NEW", "game")]);
        assert_eq!(fresh[0].name(), "NEW");
    }

    #[test]
    fn entries_age_out_when_max_age_is_set() {
        let mut cache = CompletionCache::with_max_age(Some(Duration::from_secs(30)));
        let start = Instant::now();
        cache.insert_at("os", Vec::new(), start);
        assert!(cache.get_at("os", start + Duration::from_secs(29)).is_some());
        assert!(cache.get_at("os", start + Duration::from_secs(30)).is_none());
        assert!(cache.contains("os"));
    }
}
