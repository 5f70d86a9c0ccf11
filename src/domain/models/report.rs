//! Performance report types produced by the cache registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::cache::{CacheMetrics, EvictionStrategy};

/// Aggregated timings for one named operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub calls: usize,
    /// Sum of recorded durations, in milliseconds.
    pub total_duration: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub optimization_hints: Vec<String>,
}

/// Snapshot of every timed operation and every cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub per_operation: BTreeMap<String, OperationStats>,
    pub per_cache: BTreeMap<String, CacheMetrics>,
    pub total_memory_mb: f64,
    pub recommendations: Vec<String>,
}

/// Advisory change for a single cache. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OptimizationSuggestion {
    /// Capacity looks too small for the working set.
    IncreaseCapacity {
        cache: String,
        current: usize,
        suggested: usize,
    },
    /// Another eviction strategy would likely keep more hits.
    SwitchStrategy {
        cache: String,
        from: EvictionStrategy,
        to: EvictionStrategy,
    },
}

impl fmt::Display for OptimizationSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncreaseCapacity {
                cache,
                current,
                suggested,
            } => write!(
                f,
                "Increase capacity of '{cache}' from {current} to {suggested} entries"
            ),
            Self::SwitchStrategy { cache, from, to } => {
                write!(f, "Switch '{cache}' eviction strategy from {from} to {to}")
            }
        }
    }
}
