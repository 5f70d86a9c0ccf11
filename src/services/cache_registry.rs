//! Registry of named, independently configured caches.
//!
//! One cache per semantic domain (schema, validation, UI state, config) is
//! created up front from [`CacheProfile`]s; callers can add ad-hoc caches.
//! The registry also keeps named operation timings and folds them, together
//! with per-cache metrics, into a [`PerformanceReport`].
//!
//! Values are stored as `serde_json::Value` so caches with different payload
//! types can live side by side. Nothing here returns an error: unknown caches,
//! payloads that fail to (de)serialize and misses all surface as `None`/`false`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache_engine::Cache;
use super::cache_key::{cache_key, prefixed_key};
use crate::domain::models::{
    CacheDomain, CacheMetrics, CacheProfile, Config, EvictionStrategy, OperationStats,
    OptimizationSuggestion, PerformanceReport,
};

/// Most recent samples kept per operation.
pub const MAX_TIMING_SAMPLES: usize = 1000;
/// Started-but-unfinished timings kept before the oldest is dropped.
pub const MAX_PENDING_TIMINGS: usize = 1000;

const CACHE_HINT_MS: f64 = 500.0;
const ASYNC_HINT_MS: f64 = 1000.0;
const LOW_HIT_RATIO: f64 = 0.3;
const SWITCH_STRATEGY_HIT_RATIO: f64 = 0.5;
const LOW_UTILIZATION: f64 = 0.5;
const MEMORY_WARNING_MB: f64 = 50.0;

/// Owner of every named cache plus the operation timing log.
#[derive(Debug)]
pub struct CacheRegistry {
    caches: BTreeMap<String, Cache<Value>>,
    timings: HashMap<String, VecDeque<f64>>,
    timing_starts: HashMap<String, Instant>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRegistry {
    /// Registry with the built-in domain caches at their default profiles.
    pub fn new() -> Self {
        Self::with_profiles(
            CacheDomain::ALL
                .iter()
                .map(|domain| (domain.as_str().to_string(), domain.default_profile())),
        )
    }

    /// Registry with caches taken from configuration.
    ///
    /// Built-in domains missing from the config still get their defaults.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::with_profiles(
            config
                .caches
                .iter()
                .map(|(name, profile)| (name.clone(), *profile)),
        );
        for domain in CacheDomain::ALL {
            registry.create_cache(domain.as_str(), domain.default_profile());
        }
        registry
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = (String, CacheProfile)>) -> Self {
        let caches = profiles
            .into_iter()
            .map(|(name, profile)| {
                let cache = Cache::new(name.clone(), profile);
                (name, cache)
            })
            .collect();
        Self {
            caches,
            timings: HashMap::new(),
            timing_starts: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Cache management
    // ------------------------------------------------------------------

    /// Get or create a cache. An existing cache keeps its original profile.
    pub fn create_cache(&mut self, name: &str, profile: CacheProfile) -> &mut Cache<Value> {
        self.caches.entry(name.to_string()).or_insert_with(|| {
            debug!(cache = name, strategy = %profile.strategy, max_entries = profile.max_entries, "created cache");
            Cache::new(name, profile)
        })
    }

    pub fn cache(&self, name: &str) -> Option<&Cache<Value>> {
        self.caches.get(name)
    }

    pub fn cache_mut(&mut self, name: &str) -> Option<&mut Cache<Value>> {
        self.caches.get_mut(name)
    }

    pub fn remove_cache(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    pub fn cache_names(&self) -> Vec<&str> {
        self.caches.keys().map(String::as_str).collect()
    }

    /// Store a serializable value in a named cache.
    ///
    /// Returns false if the cache does not exist or the value cannot be
    /// represented as JSON. Unlike [`Cache::put`], which stores such a value
    /// under a fallback size estimate, the registry refuses it: entries here
    /// are JSON and must read back through [`CacheRegistry::get`].
    pub fn put<T: Serialize + ?Sized>(
        &mut self,
        cache_name: &str,
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let Some(cache) = self.caches.get_mut(cache_name) else {
            warn!(cache = cache_name, "put against unknown cache");
            return false;
        };
        match serde_json::to_value(value) {
            Ok(json) => {
                cache.put(key, json, ttl);
                true
            }
            Err(err) => {
                warn!(cache = cache_name, error = %err, "value not cacheable");
                false
            }
        }
    }

    /// Fetch and deserialize a value from a named cache.
    pub fn get<T: DeserializeOwned>(&mut self, cache_name: &str, key: &str) -> Option<T> {
        let value = self.caches.get_mut(cache_name)?.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(cache = cache_name, key, error = %err, "cached value has unexpected shape");
                None
            }
        }
    }

    pub fn invalidate(&mut self, cache_name: &str, key: &str) -> bool {
        self.caches
            .get_mut(cache_name)
            .is_some_and(|cache| cache.invalidate(key))
    }

    /// Invalidate every key in `cache_name` that starts with `prefix`.
    pub fn invalidate_by_prefix(&mut self, cache_name: &str, prefix: &str) -> usize {
        let removed = self
            .caches
            .get_mut(cache_name)
            .map_or(0, |cache| cache.invalidate_prefix(prefix));
        debug!(cache = cache_name, prefix, removed, "invalidated by prefix");
        removed
    }

    /// Drop expired entries from every cache.
    pub fn purge_expired(&mut self) -> usize {
        self.caches.values_mut().map(Cache::purge_expired).sum()
    }

    /// Clear every cache and forget all timings. Caches stay registered.
    pub fn reset(&mut self) {
        for cache in self.caches.values_mut() {
            cache.clear();
        }
        self.timings.clear();
        self.timing_starts.clear();
    }

    // ------------------------------------------------------------------
    // Domain accessors
    // ------------------------------------------------------------------

    fn put_domain<T: Serialize + ?Sized>(&mut self, domain: CacheDomain, key: String, value: &T) {
        if !self.caches.contains_key(domain.as_str()) {
            self.create_cache(domain.as_str(), domain.default_profile());
        }
        self.put(domain.as_str(), key, value, None);
    }

    /// Cache a schema derived from `source`.
    pub fn cache_schema<S, T>(&mut self, source: &S, schema: &T)
    where
        S: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let key = prefixed_key(CacheDomain::Schema.as_str(), source);
        self.put_domain(CacheDomain::Schema, key, schema);
    }

    pub fn get_cached_schema<S, T>(&mut self, source: &S) -> Option<T>
    where
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = prefixed_key(CacheDomain::Schema.as_str(), source);
        self.get(CacheDomain::Schema.as_str(), &key)
    }

    /// Cache the validation result of `value` for `field`.
    ///
    /// Keys are `{field}_{hash}`, so all results for a field share a prefix.
    pub fn cache_validation<S, T>(&mut self, field: &str, value: &S, result: &T)
    where
        S: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let key = validation_key(field, value);
        self.put_domain(CacheDomain::Validation, key, result);
    }

    pub fn get_cached_validation<S, T>(&mut self, field: &str, value: &S) -> Option<T>
    where
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = validation_key(field, value);
        self.get(CacheDomain::Validation.as_str(), &key)
    }

    /// Forget every cached validation result for one field.
    ///
    /// Fields whose names merely start with `field` (`email` vs
    /// `email_confirm`) are left alone.
    pub fn invalidate_field_validations(&mut self, field: &str) -> usize {
        let prefix = format!("{field}_");
        let removed = self
            .caches
            .get_mut(CacheDomain::Validation.as_str())
            .map_or(0, |cache| {
                cache.invalidate_where(|key| {
                    key.strip_prefix(&prefix).is_some_and(is_bare_hash)
                })
            });
        debug!(field, removed, "invalidated field validations");
        removed
    }

    pub fn cache_ui_state<T: Serialize + ?Sized>(&mut self, component: &str, state: &T) {
        self.put_domain(CacheDomain::UiState, ui_state_key(component), state);
    }

    pub fn get_cached_ui_state<T: DeserializeOwned>(&mut self, component: &str) -> Option<T> {
        self.get(CacheDomain::UiState.as_str(), &ui_state_key(component))
    }

    /// Cache a configuration object derived from `source`.
    pub fn cache_config<S, T>(&mut self, source: &S, config: &T)
    where
        S: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let key = prefixed_key(CacheDomain::Config.as_str(), source);
        self.put_domain(CacheDomain::Config, key, config);
    }

    pub fn get_cached_config<S, T>(&mut self, source: &S) -> Option<T>
    where
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = prefixed_key(CacheDomain::Config.as_str(), source);
        self.get(CacheDomain::Config.as_str(), &key)
    }

    // ------------------------------------------------------------------
    // Timing
    // ------------------------------------------------------------------

    /// Mark the start of an operation under a caller-chosen unique id.
    ///
    /// At most [`MAX_PENDING_TIMINGS`] starts are held; beyond that the
    /// oldest unfinished one is forgotten.
    pub fn start_timing(&mut self, operation_id: &str) {
        if self.timing_starts.len() >= MAX_PENDING_TIMINGS
            && !self.timing_starts.contains_key(operation_id)
        {
            let oldest = self
                .timing_starts
                .iter()
                .min_by_key(|(_, started)| **started)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                warn!(operation_id = %oldest, "dropping timing that was never ended");
                self.timing_starts.remove(&oldest);
            }
        }
        self.timing_starts
            .insert(operation_id.to_string(), Instant::now());
    }

    /// Timings started but not yet ended.
    pub fn pending_timings(&self) -> usize {
        self.timing_starts.len()
    }

    /// Finish the operation started under `operation_id`.
    ///
    /// Returns the elapsed milliseconds, or `None` if there was no matching
    /// start.
    pub fn end_timing(&mut self, operation_id: &str, operation_name: &str) -> Option<f64> {
        let started = self.timing_starts.remove(operation_id)?;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.record_duration(operation_name, duration_ms);
        Some(duration_ms)
    }

    /// Append a sample, keeping only the latest [`MAX_TIMING_SAMPLES`].
    pub fn record_duration(&mut self, operation_name: &str, duration_ms: f64) {
        let samples = self
            .timings
            .entry(operation_name.to_string())
            .or_default();
        samples.push_back(duration_ms);
        while samples.len() > MAX_TIMING_SAMPLES {
            samples.pop_front();
        }
    }

    /// Run `f` and record how long it took under `name`.
    pub fn timed<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let id = Uuid::new_v4().to_string();
        self.start_timing(&id);
        let output = f();
        self.end_timing(&id, name);
        output
    }

    /// Await `fut` and record how long it took under `name`.
    pub async fn timed_async<F: Future>(&mut self, name: &str, fut: F) -> F::Output {
        let id = Uuid::new_v4().to_string();
        self.start_timing(&id);
        let output = fut.await;
        self.end_timing(&id, name);
        output
    }

    /// Wrap a callable so every invocation is timed under `name`.
    pub fn wrap<'a, A, T, F>(&'a mut self, name: &'a str, mut f: F) -> impl FnMut(A) -> T + 'a
    where
        A: 'a,
        T: 'a,
        F: FnMut(A) -> T + 'a,
    {
        move |arg| self.timed(name, || f(arg))
    }

    pub fn timing_samples(&self, operation_name: &str) -> usize {
        self.timings.get(operation_name).map_or(0, VecDeque::len)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub fn total_memory_mb(&self) -> f64 {
        self.caches
            .values()
            .map(|cache| cache.metrics().memory_usage_mb)
            .sum()
    }

    pub fn report(&self) -> PerformanceReport {
        let per_operation: BTreeMap<String, OperationStats> = self
            .timings
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(name, samples)| (name.clone(), operation_stats(samples)))
            .collect();

        let per_cache: BTreeMap<String, CacheMetrics> = self
            .caches
            .iter()
            .map(|(name, cache)| (name.clone(), cache.metrics()))
            .collect();

        let total_memory_mb = per_cache.values().map(|m| m.memory_usage_mb).sum();
        let recommendations = recommendations(&per_operation, &per_cache, total_memory_mb);
        for recommendation in &recommendations {
            info!(recommendation = %recommendation, "performance recommendation");
        }

        PerformanceReport {
            generated_at: chrono::Utc::now(),
            per_operation,
            per_cache,
            total_memory_mb,
            recommendations,
        }
    }

    /// Advisory tuning for one cache. The cache itself is left untouched.
    pub fn optimize(&self, cache_name: &str) -> Vec<OptimizationSuggestion> {
        let Some(cache) = self.caches.get(cache_name) else {
            return Vec::new();
        };
        let metrics = cache.metrics();
        let mut suggestions = Vec::new();

        if metrics.hit_ratio < LOW_HIT_RATIO && metrics.utilization() < LOW_UTILIZATION {
            suggestions.push(OptimizationSuggestion::IncreaseCapacity {
                cache: cache_name.to_string(),
                current: metrics.size,
                suggested: metrics.size.saturating_mul(2),
            });
        }
        if metrics.hit_ratio < SWITCH_STRATEGY_HIT_RATIO && cache.strategy() == EvictionStrategy::Lru
        {
            suggestions.push(OptimizationSuggestion::SwitchStrategy {
                cache: cache_name.to_string(),
                from: EvictionStrategy::Lru,
                to: EvictionStrategy::Adaptive,
            });
        }
        suggestions
    }
}

fn validation_key<S: Serialize + ?Sized>(field: &str, value: &S) -> String {
    format!("{field}_{}", cache_key(value))
}

/// Whether `rest` is a whole [`cache_key`] hash (lowercase base 36).
fn is_bare_hash(rest: &str) -> bool {
    !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

fn ui_state_key(component: &str) -> String {
    format!("ui_{component}")
}

fn operation_stats(samples: &VecDeque<f64>) -> OperationStats {
    let calls = samples.len();
    let total_duration: f64 = samples.iter().sum();
    let avg = total_duration / calls as f64;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut optimization_hints = Vec::new();
    if avg > CACHE_HINT_MS {
        optimization_hints.push("Consider caching the results of this operation".to_string());
    }
    if avg > ASYNC_HINT_MS {
        optimization_hints
            .push("Consider restructuring this operation to run asynchronously".to_string());
    }

    OperationStats {
        calls,
        total_duration,
        avg,
        min,
        max,
        optimization_hints,
    }
}

fn recommendations(
    per_operation: &BTreeMap<String, OperationStats>,
    per_cache: &BTreeMap<String, CacheMetrics>,
    total_memory_mb: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    for (name, stats) in per_operation {
        if stats.avg > ASYNC_HINT_MS {
            recommendations.push(format!(
                "Operation '{name}' averages {:.0}ms; move it off the interactive path",
                stats.avg
            ));
        } else if stats.avg > CACHE_HINT_MS {
            recommendations.push(format!(
                "Operation '{name}' averages {:.0}ms; cache its results",
                stats.avg
            ));
        }
    }

    for (name, metrics) in per_cache {
        if metrics.total_requests() > 0 && metrics.hit_ratio < LOW_HIT_RATIO {
            recommendations.push(format!(
                "Cache '{name}' hit ratio is {:.0}%; consider a different eviction strategy or capacity",
                metrics.hit_ratio * 100.0
            ));
        }
    }

    if total_memory_mb > MEMORY_WARNING_MB {
        recommendations.push(format!(
            "Caches hold {total_memory_mb:.1}MB; consider lowering capacities or TTLs"
        ));
    }

    recommendations
}
