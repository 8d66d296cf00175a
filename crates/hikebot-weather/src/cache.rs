use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Cache entry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub access_count: u64,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            access_count: 0,
            ttl,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn touch(&mut self) {
        self.access_count += 1;
    }
}

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Entry count at which an insert first sweeps expired entries.
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// Concurrent map whose entries expire a fixed time after insertion.
/// Expired entries are dropped on lookup, and swept on insert once the map
/// reaches the purge threshold.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    purge_threshold: usize,
    next_purge_at: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_purge_threshold(ttl, DEFAULT_PURGE_THRESHOLD)
    }

    pub fn with_purge_threshold(ttl: Duration, purge_threshold: usize) -> Self {
        let purge_threshold = purge_threshold.max(1);
        Self {
            entries: DashMap::new(),
            ttl,
            purge_threshold,
            next_purge_at: AtomicUsize::new(purge_threshold),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired() {
                entry.touch();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }

        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        if self.entries.len() >= self.next_purge_at.load(Ordering::Relaxed) {
            self.purge_expired();
            // Live entries past the threshold push the next sweep out.
            let next = (self.entries.len() * 2).max(self.purge_threshold);
            self.next_purge_at.store(next, Ordering::Relaxed);
        }
        self.entries.insert(key, CacheEntry::new(value, self.ttl));
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expiry_is_time_based() {
        let entry = CacheEntry::new("x", Duration::from_secs(60));
        assert!(!entry.is_expired_at(entry.created_at + Duration::from_secs(59)));
        assert!(entry.is_expired_at(entry.created_at + Duration::from_secs(60)));
    }

    #[test]
    fn hits_and_misses_are_counted() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"a"), None);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"a"), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::from_millis(10));
        cache.insert(1, 1);
        cache.insert(2, 2);
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 2);
    }

    #[test]
    fn inserts_sweep_expired_entries_past_the_threshold() {
        let cache: TtlCache<u32, u32> =
            TtlCache::with_purge_threshold(Duration::from_millis(5), 100);
        for key in 0..1000 {
            cache.insert(key, key);
        }
        std::thread::sleep(Duration::from_millis(20));

        for key in 1000..2000 {
            cache.insert(key, key);
        }
        assert!(cache.len() <= 1000, "stale entries kept: {}", cache.len());
        assert!(cache.stats().expirations >= 1000);
    }

    #[test]
    fn live_entries_survive_a_sweep() {
        let cache: TtlCache<u32, u32> = TtlCache::with_purge_threshold(Duration::from_secs(60), 4);
        for key in 0..50 {
            cache.insert(key, key);
        }
        assert_eq!(cache.len(), 50);
        assert_eq!(cache.stats().expirations, 0);
    }
}
