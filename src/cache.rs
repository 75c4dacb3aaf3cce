use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;

/// Namespace for entries produced by the Instagram fetcher.
pub const INSTAGRAM_NAMESPACE: &str = "instagram";

/// 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Builds a cache key. The namespace stays part of the key so several fetch
/// sources can share one cache without colliding.
pub fn cache_key(namespace: &str, canonical_url: &str) -> String {
    format!("{namespace}:{canonical_url}")
}

struct CacheEntry<V> {
    value: V,
    stored_at_ms: u64,
    ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at_ms) < self.ttl_ms
    }
}

/// In-memory TTL cache.
///
/// Expiry is lazy: `get` hides and drops stale entries, and [`ResultCache::sweep`]
/// bounds memory for keys nobody asks for again.
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` with the default TTL, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at_ms: self.clock.now_ms(),
            ttl_ms: ttl.as_millis() as u64,
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (Arc<ManualClock>, ResultCache<Vec<&'static str>>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = ResultCache::new(clock.clone(), DEFAULT_TTL);
        (clock, cache)
    }

    #[test]
    fn key_keeps_namespace_prefix() {
        assert_eq!(
            cache_key(INSTAGRAM_NAMESPACE, "https://instagram.com/p/ABC"),
            "instagram:https://instagram.com/p/ABC"
        );
    }

    #[test]
    fn get_within_ttl_returns_stored_value() {
        let (clock, cache) = cache_with_clock();
        cache.set("k", vec!["a", "b"]);
        clock.advance(Duration::from_secs(29 * 60));
        assert_eq!(cache.get("k"), Some(vec!["a", "b"]));
    }

    #[test]
    fn get_after_ttl_returns_none_and_evicts() {
        let (clock, cache) = cache_with_clock();
        cache.set("k", vec!["a"]);
        clock.advance(DEFAULT_TTL);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let (_clock, cache) = cache_with_clock();
        cache.set("k", vec!["old"]);
        cache.set("k", vec!["new"]);
        assert_eq!(cache.get("k"), Some(vec!["new"]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overwrite_restarts_ttl() {
        let (clock, cache) = cache_with_clock();
        cache.set("k", vec!["old"]);
        clock.advance(Duration::from_secs(20 * 60));
        cache.set("k", vec!["new"]);
        clock.advance(Duration::from_secs(20 * 60));
        assert_eq!(cache.get("k"), Some(vec!["new"]));
    }

    #[test]
    fn per_entry_ttl_override() {
        let (clock, cache) = cache_with_clock();
        cache.set_with_ttl("short", vec!["x"], Duration::from_secs(5));
        cache.set("long", vec!["y"]);
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(vec!["y"]));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (clock, cache) = cache_with_clock();
        cache.set("stale", vec!["x"]);
        clock.advance(Duration::from_secs(31 * 60));
        cache.set("fresh", vec!["y"]);

        // Expired entries stay physically present until swept.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(vec!["y"]));
    }

    #[test]
    fn missing_key_is_none() {
        let (_clock, cache) = cache_with_clock();
        assert_eq!(cache.get("nope"), None);
    }
}
