//! Cache domain models.
//!
//! Entries, eviction strategies, per-key access windows and the metrics
//! snapshot reported by every cache. Timestamps use [`tokio::time::Instant`]
//! so paused-clock tests can drive TTL expiry deterministically.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// How far back the access window used by adaptive scoring reaches.
pub const ACCESS_WINDOW: Duration = Duration::from_secs(3600);

/// Eviction strategy used when a cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// Evict the entry accessed longest ago.
    #[default]
    Lru,
    /// Evict the entry with the fewest accesses.
    Lfu,
    /// Sweep expired entries, falling back to LRU when nothing has expired.
    Ttl,
    /// Evict the entry with the lowest weighted recency/frequency score.
    Adaptive,
}

impl EvictionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Lfu => "lfu",
            Self::Ttl => "ttl",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "ttl" => Ok(Self::Ttl),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("Unknown eviction strategy: {other}")),
        }
    }
}

/// A single cached value with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: Instant,
    pub last_accessed_at: Instant,
    /// Logical clock value of the last access; breaks timestamp ties for LRU.
    pub last_access_seq: u64,
    pub access_count: u64,
    /// Per-entry TTL; overrides the cache default when set.
    pub ttl: Option<Duration>,
    pub size_estimate_bytes: usize,
}

impl<V> CacheEntry<V> {
    pub fn new(
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
        size_estimate_bytes: usize,
        seq: u64,
    ) -> Self {
        let now = Instant::now();
        Self {
            key: key.into(),
            value,
            created_at: now,
            last_accessed_at: now,
            last_access_seq: seq,
            access_count: 0,
            ttl,
            size_estimate_bytes,
        }
    }

    /// Whether the entry has outlived its TTL at `now`.
    ///
    /// An entry inserted with TTL `t` is expired at exactly `t` and after.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(self.created_at) >= ttl)
    }

    /// Record a hit.
    pub fn touch(&mut self, now: Instant, seq: u64) {
        self.last_accessed_at = now;
        self.last_access_seq = seq;
        self.access_count += 1;
    }
}

/// Sliding window of access timestamps for one key.
#[derive(Debug, Clone, Default)]
pub struct AccessPattern {
    accesses: VecDeque<Instant>,
}

impl AccessPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an access and drop everything older than [`ACCESS_WINDOW`].
    pub fn record(&mut self, now: Instant) {
        self.accesses.push_back(now);
        self.prune(now);
    }

    /// Number of accesses within the window ending at `now`.
    pub fn recent_count(&self, now: Instant) -> usize {
        self.accesses
            .iter()
            .filter(|at| now.saturating_duration_since(**at) < ACCESS_WINDOW)
            .count()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.accesses.front() {
            if now.saturating_duration_since(*oldest) >= ACCESS_WINDOW {
                self.accesses.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Point-in-time metrics for a cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Configured capacity.
    pub size: usize,
    /// Live entries.
    pub used: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, zero before the first lookup.
    pub hit_ratio: f64,
    pub evictions: u64,
    pub memory_usage_mb: f64,
    /// Mean wall time spent inside `get`, in milliseconds.
    pub average_access_latency: f64,
}

impl CacheMetrics {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of capacity in use.
    pub fn utilization(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.used as f64 / self.size as f64
        }
    }
}
