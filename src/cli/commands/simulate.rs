//! Implementation of the `perfcore simulate` command.
//!
//! Drives the four domain caches with a skewed, seeded workload so that
//! capacity and strategy choices can be compared offline.

use anyhow::Result;
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{CacheDomain, Config, OptimizationSuggestion, PerformanceReport};
use crate::services::CacheRegistry;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of lookups to replay
    #[arg(short, long, default_value_t = 10_000)]
    pub operations: usize,

    /// RNG seed; equal seeds replay identical workloads
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// Distinct keys per cache
    #[arg(short, long, default_value_t = 1_000)]
    pub keyspace: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulateOutput {
    pub operations: usize,
    pub seed: u64,
    pub report: PerformanceReport,
    pub suggestions: Vec<OptimizationSuggestion>,
}

impl CommandOutput for SimulateOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut sections = vec![
            format!(
                "Replayed {} operations (seed {}), {:.4} MB cached",
                self.operations, self.seed, self.report.total_memory_mb
            ),
            formatter.format_cache_metrics(&self.report.per_cache),
            formatter.format_operations(&self.report.per_operation),
        ];

        let advice: Vec<String> = self
            .report
            .recommendations
            .iter()
            .cloned()
            .chain(self.suggestions.iter().map(ToString::to_string))
            .collect();
        if !advice.is_empty() {
            sections.push(format!("Recommendations:\n  - {}", advice.join("\n  - ")));
        }
        sections.join("\n\n")
    }
}

/// Replay the workload against a fresh registry.
pub fn run(args: &SimulateArgs, config: &Config) -> SimulateOutput {
    let mut registry = CacheRegistry::from_config(config);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let keyspace = args.keyspace.max(1);

    for op in 0..args.operations {
        let domain = CacheDomain::ALL[rng.random_range(0..CacheDomain::ALL.len())];
        // squaring a uniform sample skews lookups toward low key ids
        let sample: f64 = rng.random();
        let key = ((sample * sample) * keyspace as f64) as usize;

        let timing_id = format!("op-{op}");
        registry.start_timing(&timing_id);
        lookup_or_fill(&mut registry, domain, key);
        registry.end_timing(&timing_id, domain.as_str());
    }

    let purged = registry.purge_expired();
    let report = registry.report();
    let suggestions = registry
        .cache_names()
        .into_iter()
        .flat_map(|name| registry.optimize(name))
        .collect();

    info!(
        operations = args.operations,
        seed = args.seed,
        purged,
        "simulation finished"
    );

    SimulateOutput {
        operations: args.operations,
        seed: args.seed,
        report,
        suggestions,
    }
}

fn lookup_or_fill(registry: &mut CacheRegistry, domain: CacheDomain, key: usize) {
    match domain {
        CacheDomain::Schema => {
            let source = format!("form-{key}");
            if registry
                .get_cached_schema::<_, serde_json::Value>(&source)
                .is_none()
            {
                let schema = json!({ "type": "object", "title": source });
                registry.cache_schema(&source, &schema);
            }
        }
        CacheDomain::Validation => {
            if registry
                .get_cached_validation::<_, bool>("email", &key)
                .is_none()
            {
                registry.cache_validation("email", &key, &(key % 3 != 0));
            }
        }
        CacheDomain::UiState => {
            let component = format!("panel-{key}");
            if registry
                .get_cached_ui_state::<serde_json::Value>(&component)
                .is_none()
            {
                registry.cache_ui_state(&component, &json!({ "expanded": key % 2 == 0 }));
            }
        }
        CacheDomain::Config => {
            let source = format!("tenant-{key}");
            if registry
                .get_cached_config::<_, serde_json::Value>(&source)
                .is_none()
            {
                registry.cache_config(&source, &json!({ "tenant": key, "theme": "dark" }));
            }
        }
    }
}

pub fn execute(args: &SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    output(&run(args, config), json_mode);
    Ok(())
}
