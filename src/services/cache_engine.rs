//! Single-owner key/value cache with pluggable eviction.
//!
//! `get` and `put` never suspend. Expiry is evaluated lazily: on `get`, during
//! TTL-strategy eviction sweeps, and on an explicit [`Cache::purge_expired`].
//! There is no background timer.
//!
//! When a `put` of a new key finds the cache full, exactly one eviction pass
//! runs first, chosen by the cache's [`EvictionStrategy`]:
//!
//! - `Lru`: smallest `last_accessed_at`
//! - `Lfu`: smallest `access_count`
//! - `Ttl`: every expired entry, or one LRU victim if none has expired
//! - `Adaptive`: minimum of `0.3 * recency + 0.7 * frequency`, where recency is
//!   `1 / max(seconds since last access, 1)` and frequency counts hits in the
//!   last hour
//!
//! Ties go to the first entry in storage order.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::models::{
    AccessPattern, CacheEntry, CacheMetrics, CacheProfile, EvictionStrategy,
};

const RECENCY_WEIGHT: f64 = 0.3;
const FREQUENCY_WEIGHT: f64 = 0.7;

/// Size assumed when a value cannot be serialized.
pub const FALLBACK_SIZE_BYTES: usize = 100;
const NUMBER_SIZE_BYTES: usize = 8;
const BOOL_SIZE_BYTES: usize = 4;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const PREALLOCATE_LIMIT: usize = 1024;

/// Estimate the in-memory footprint of a value.
///
/// Text counts two bytes per UTF-16 unit, structured values two bytes per unit
/// of their JSON form, and primitives a small fixed amount.
pub fn estimate_size<V: Serialize + ?Sized>(value: &V) -> usize {
    use serde_json::Value;

    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s.encode_utf16().count() * 2,
        Ok(Value::Number(_)) => NUMBER_SIZE_BYTES,
        Ok(Value::Bool(_)) => BOOL_SIZE_BYTES,
        Ok(Value::Null) => 0,
        Ok(structured) => structured.to_string().encode_utf16().count() * 2,
        Err(_) => FALLBACK_SIZE_BYTES,
    }
}

/// A named cache owning its entries exclusively.
#[derive(Debug)]
pub struct Cache<V> {
    name: String,
    profile: CacheProfile,
    entries: IndexMap<String, CacheEntry<V>>,
    patterns: HashMap<String, AccessPattern>,
    hits: u64,
    misses: u64,
    evictions: u64,
    /// Logical clock bumped on every insert and hit.
    seq: u64,
    access_time: Duration,
    timed_accesses: u64,
}

impl<V> Cache<V> {
    /// Create an empty cache. A zero capacity is raised to one.
    pub fn new(name: impl Into<String>, profile: CacheProfile) -> Self {
        let profile = CacheProfile {
            max_entries: profile.max_entries.max(1),
            ..profile
        };
        Self {
            name: name.into(),
            profile,
            entries: IndexMap::with_capacity(profile.max_entries.min(PREALLOCATE_LIMIT)),
            patterns: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
            seq: 0,
            access_time: Duration::ZERO,
            timed_accesses: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn profile(&self) -> &CacheProfile {
        &self.profile
    }

    pub const fn strategy(&self) -> EvictionStrategy {
        self.profile.strategy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the current key space, expired entries included.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether `key` holds a live entry. Does not count as an access.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Look up a live value, recording a hit or a miss.
    ///
    /// An expired entry is removed and the lookup counts as a miss.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let started = std::time::Instant::now();
        let now = Instant::now();

        let expired = self.entries.get(key).map(|entry| entry.is_expired_at(now));
        let hit = match expired {
            None => false,
            Some(true) => {
                debug!(cache = %self.name, key, "entry expired");
                self.remove_entry(key);
                false
            }
            Some(false) => true,
        };

        if hit {
            self.hits += 1;
            self.seq += 1;
            let seq = self.seq;
            if let Some(entry) = self.entries.get_mut(key) {
                entry.touch(now, seq);
            }
            self.patterns.entry(key.to_string()).or_default().record(now);
        } else {
            self.misses += 1;
        }

        self.access_time += started.elapsed();
        self.timed_accesses += 1;

        if hit {
            self.entries.get(key).map(|entry| &entry.value)
        } else {
            None
        }
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix))
    }

    /// Remove every entry whose key matches `predicate`.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &doomed {
            self.remove_entry(key);
        }
        doomed.len()
    }

    /// Drop all entries and access history, and zero the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.patterns.clear();
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
        self.access_time = Duration::ZERO;
        self.timed_accesses = 0;
    }

    /// Remove every expired entry. Not counted as evictions.
    pub fn purge_expired(&mut self) -> usize {
        self.remove_expired(Instant::now())
    }

    /// Run one eviction pass. Returns how many entries were removed.
    ///
    /// Evicting from an empty cache is a no-op.
    pub fn evict(&mut self) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let now = Instant::now();

        let removed = match self.profile.strategy {
            EvictionStrategy::Lru => self.evict_victim(self.lru_victim()),
            EvictionStrategy::Lfu => self.evict_victim(self.lfu_victim()),
            EvictionStrategy::Ttl => match self.remove_expired(now) {
                0 => self.evict_victim(self.lru_victim()),
                swept => swept,
            },
            EvictionStrategy::Adaptive => self.evict_victim(self.adaptive_victim(now)),
        };

        self.evictions += removed as u64;
        removed
    }

    /// Adaptive score for a key, if present.
    pub fn adaptive_score(&self, key: &str) -> Option<f64> {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| self.score_entry(entry, now))
    }

    pub fn metrics(&self) -> CacheMetrics {
        let total = self.hits + self.misses;
        let memory_bytes: usize = self
            .entries
            .values()
            .map(|entry| entry.size_estimate_bytes)
            .sum();
        let average_access_latency = if self.timed_accesses == 0 {
            0.0
        } else {
            self.access_time.as_secs_f64() * 1000.0 / self.timed_accesses as f64
        };

        CacheMetrics {
            size: self.profile.max_entries,
            used: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
            evictions: self.evictions,
            memory_usage_mb: memory_bytes as f64 / BYTES_PER_MB,
            average_access_latency,
        }
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        self.patterns.remove(key);
        self.entries.shift_remove(key).is_some()
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
        }
        if !expired.is_empty() {
            debug!(cache = %self.name, count = expired.len(), "removed expired entries");
        }
        expired.len()
    }

    fn evict_victim(&mut self, victim: Option<String>) -> usize {
        match victim {
            Some(key) => {
                debug!(
                    cache = %self.name,
                    strategy = %self.profile.strategy,
                    key = %key,
                    "evicting entry"
                );
                usize::from(self.remove_entry(&key))
            }
            None => 0,
        }
    }

    fn lru_victim(&self) -> Option<String> {
        self.entries
            .values()
            .min_by_key(|entry| (entry.last_accessed_at, entry.last_access_seq))
            .map(|entry| entry.key.clone())
    }

    fn lfu_victim(&self) -> Option<String> {
        self.entries
            .values()
            .min_by_key(|entry| entry.access_count)
            .map(|entry| entry.key.clone())
    }

    fn adaptive_victim(&self, now: Instant) -> Option<String> {
        self.entries
            .values()
            .map(|entry| (entry, self.score_entry(entry, now)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(entry, _)| entry.key.clone())
    }

    fn score_entry(&self, entry: &CacheEntry<V>, now: Instant) -> f64 {
        let idle_secs = now
            .saturating_duration_since(entry.last_accessed_at)
            .as_secs_f64();
        let recency = 1.0 / idle_secs.max(1.0);
        let frequency = self
            .patterns
            .get(&entry.key)
            .map_or(0, |pattern| pattern.recent_count(now)) as f64;

        RECENCY_WEIGHT.mul_add(recency, FREQUENCY_WEIGHT * frequency)
    }
}

impl<V: Serialize> Cache<V> {
    /// Insert or replace `key`.
    ///
    /// `ttl` overrides the cache default. A full cache runs one eviction
    /// before the insert, even when `key` is already present, so the
    /// capacity bound holds once this returns.
    pub fn put(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let size = estimate_size(&value);

        if self.entries.len() >= self.profile.max_entries {
            self.evict();
        }

        self.seq += 1;
        let ttl = ttl.or_else(|| self.profile.default_ttl());
        let entry = CacheEntry::new(key.clone(), value, ttl, size, self.seq);
        self.patterns.remove(&key);
        self.entries.insert(key, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::advance;

    fn cache(strategy: EvictionStrategy, max_entries: usize) -> Cache<String> {
        Cache::new("test", CacheProfile::new(strategy, max_entries))
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_evicts_least_recently_accessed() {
        let mut cache = cache(EvictionStrategy::Lru, 2);
        cache.put("a", "A".to_string(), None);
        advance(Duration::from_secs(1)).await;
        cache.put("b", "B".to_string(), None);
        advance(Duration::from_secs(1)).await;

        assert_eq!(cache.get("a").map(String::as_str), Some("A"));
        advance(Duration::from_secs(1)).await;
        cache.put("c", "C".to_string(), None);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn test_lru_orders_same_instant_accesses_by_sequence() {
        let mut cache = cache(EvictionStrategy::Lru, 2);
        cache.put("a", "A".to_string(), None);
        cache.put("b", "B".to_string(), None);
        cache.get("a");
        cache.put("c", "C".to_string(), None);

        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_lfu_evicts_least_frequently_accessed() {
        let mut cache = cache(EvictionStrategy::Lfu, 3);
        cache.put("a", "A".to_string(), None);
        cache.put("b", "B".to_string(), None);
        cache.put("c", "C".to_string(), None);
        for _ in 0..3 {
            cache.get("a");
            cache.get("c");
        }
        cache.get("b");
        cache.put("d", "D".to_string(), None);

        assert!(!cache.contains("b"));
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_strategy_sweeps_all_expired() {
        let mut cache = cache(EvictionStrategy::Ttl, 3);
        cache.put("short1", "1".to_string(), Some(Duration::from_secs(5)));
        cache.put("short2", "2".to_string(), Some(Duration::from_secs(5)));
        cache.put("long", "3".to_string(), Some(Duration::from_secs(60)));

        advance(Duration::from_secs(10)).await;
        cache.put("new", "4".to_string(), None);

        assert_eq!(cache.keys(), vec!["long".to_string(), "new".to_string()]);
        assert_eq!(cache.metrics().evictions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_strategy_falls_back_to_lru() {
        let mut cache = cache(EvictionStrategy::Ttl, 2);
        cache.put("a", "A".to_string(), Some(Duration::from_secs(60)));
        advance(Duration::from_secs(1)).await;
        cache.put("b", "B".to_string(), Some(Duration::from_secs(60)));
        advance(Duration::from_secs(1)).await;
        cache.get("a");
        cache.put("c", "C".to_string(), None);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_prefers_frequency_over_recency() {
        let mut cache = cache(EvictionStrategy::Adaptive, 2);
        cache.put("frequent", "F".to_string(), None);
        for _ in 0..5 {
            cache.get("frequent");
        }
        advance(Duration::from_secs(100)).await;

        cache.put("recent", "R".to_string(), None);
        cache.get("recent");

        let frequent = cache.adaptive_score("frequent").unwrap();
        let recent = cache.adaptive_score("recent").unwrap();
        assert!((frequent - (0.3 * 0.01 + 0.7 * 5.0)).abs() < 1e-9);
        assert!((recent - 1.0).abs() < 1e-9);

        cache.put("incoming", "I".to_string(), None);
        assert!(cache.contains("frequent"));
        assert!(!cache.contains("recent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_forgets_accesses_older_than_an_hour() {
        let mut cache = cache(EvictionStrategy::Adaptive, 2);
        cache.put("stale", "S".to_string(), None);
        for _ in 0..10 {
            cache.get("stale");
        }
        advance(Duration::from_secs(3_700)).await;
        cache.put("fresh", "F".to_string(), None);
        cache.get("fresh");

        cache.put("incoming", "I".to_string(), None);
        assert!(!cache.contains("stale"));
        assert!(cache.contains("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_respects_ttl_boundary() {
        let mut cache = cache(EvictionStrategy::Lru, 4);
        cache.put("k", "v".to_string(), Some(Duration::from_secs(5)));

        advance(Duration::from_millis(4_999)).await;
        assert!(cache.get("k").is_some());

        advance(Duration::from_millis(1)).await;
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies_when_put_has_none() {
        let mut cache: Cache<String> = Cache::new(
            "defaults",
            CacheProfile::new(EvictionStrategy::Lru, 4).with_ttl_secs(10),
        );
        cache.put("default", "d".to_string(), None);
        cache.put("override", "o".to_string(), Some(Duration::from_secs(30)));

        advance(Duration::from_secs(15)).await;
        assert!(cache.get("default").is_none());
        assert!(cache.get("override").is_some());
    }

    #[test]
    fn test_replacing_key_in_full_cache_still_evicts() {
        let mut cache = cache(EvictionStrategy::Lru, 2);
        cache.put("a", "A".to_string(), None);
        cache.put("b", "B".to_string(), None);
        cache.put("a", "A2".to_string(), None);

        assert_eq!(cache.metrics().evictions, 1);
        assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(cache.get("a").map(String::as_str), Some("A2"));
    }

    #[test]
    fn test_replacing_key_below_capacity_does_not_evict() {
        let mut cache = cache(EvictionStrategy::Lru, 3);
        cache.put("a", "A".to_string(), None);
        cache.put("b", "B".to_string(), None);
        cache.put("a", "A2".to_string(), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[test]
    fn test_evict_on_empty_cache_is_noop() {
        let mut cache = cache(EvictionStrategy::Adaptive, 2);
        assert_eq!(cache.evict(), 0);
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut cache = cache(EvictionStrategy::Lru, 0);
        cache.put("a", "A".to_string(), None);
        cache.put("b", "B".to_string(), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.profile().max_entries, 1);
    }

    #[test]
    fn test_invalidate_and_prefix() {
        let mut cache = cache(EvictionStrategy::Lru, 10);
        cache.put("field_x_1", "1".to_string(), None);
        cache.put("field_x_2", "2".to_string(), None);
        cache.put("field_y_1", "3".to_string(), None);

        assert!(cache.invalidate("field_y_1"));
        assert!(!cache.invalidate("field_y_1"));
        assert_eq!(cache.invalidate_prefix("field_x_"), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_where_matches_predicate() {
        let mut cache = cache(EvictionStrategy::Lru, 10);
        cache.put("short", "1".to_string(), None);
        cache.put("longer", "2".to_string(), None);

        assert_eq!(cache.invalidate_where(|key| key.len() > 5), 1);
        assert_eq!(cache.keys(), vec!["short".to_string()]);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut cache = cache(EvictionStrategy::Lru, 1);
        cache.put("a", "A".to_string(), None);
        cache.get("a");
        cache.get("missing");
        cache.put("b", "B".to_string(), None);

        cache.clear();
        let metrics = cache.metrics();
        assert_eq!(metrics.used, 0);
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.misses, 0);
        assert_eq!(metrics.evictions, 0);
        assert!(metrics.hit_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn test_metrics_hit_ratio_and_memory() {
        let mut cache = cache(EvictionStrategy::Lru, 10);
        assert!(cache.metrics().hit_ratio.abs() < f64::EPSILON);

        cache.put("a", "abcd".to_string(), None);
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("nope");

        let metrics = cache.metrics();
        assert!((metrics.hit_ratio - 0.75).abs() < f64::EPSILON);
        assert!((metrics.memory_usage_mb - 8.0 / BYTES_PER_MB).abs() < f64::EPSILON);
        assert_eq!(metrics.size, 10);
        assert_eq!(metrics.used, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_is_not_an_eviction() {
        let mut cache = cache(EvictionStrategy::Lru, 10);
        cache.put("a", "A".to_string(), Some(Duration::from_secs(1)));
        cache.put("b", "B".to_string(), None);
        advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.keys(), vec!["b".to_string()]);
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[test]
    fn test_estimate_size() {
        assert_eq!(estimate_size("abc"), 6);
        assert_eq!(estimate_size(&42_u32), NUMBER_SIZE_BYTES);
        assert_eq!(estimate_size(&true), BOOL_SIZE_BYTES);
        assert_eq!(estimate_size(&json!({"a": 1})), "{\"a\":1}".len() * 2);
        assert_eq!(estimate_size(&[1, 2]), "[1,2]".len() * 2);
    }

    #[test]
    fn test_estimate_size_falls_back_when_unserializable() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");
        assert_eq!(estimate_size(&bad), FALLBACK_SIZE_BYTES);
    }
}
