//! Implementation of the `perfcore probe` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::time::Instant;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::OrchestratorConfig;
use crate::infrastructure::http::join_endpoint;
use crate::services::{CallOptions, OrchestratorStats, RequestOrchestrator};

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Backend base URL, e.g. http://localhost:8080
    pub base_url: String,

    /// Also GET this path through the orchestrator and print the JSON body
    #[arg(short, long)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProbeOutput {
    pub health_url: String,
    pub reachable: bool,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stats: OrchestratorStats,
}

impl CommandOutput for ProbeOutput {
    fn to_human(&self) -> String {
        let status = if self.reachable { "reachable" } else { "unreachable" };
        let mut lines = vec![format!(
            "{} is {status} ({:.1} ms)",
            self.health_url, self.elapsed_ms
        )];
        if let Some(body) = &self.body {
            lines.push(serde_json::to_string_pretty(body).unwrap_or_default());
        }
        if let Some(error) = &self.error {
            lines.push(format!("Request failed: {error}"));
        }
        lines.push(format!(
            "Requests: {} completed, {} failed",
            self.stats.completed, self.stats.failed
        ));
        lines.join("\n")
    }
}

pub async fn execute(args: &ProbeArgs, config: OrchestratorConfig, json_mode: bool) -> Result<()> {
    let health_url = join_endpoint(&args.base_url, &config.health_path);
    let orchestrator = RequestOrchestrator::new(config)?;

    let started = Instant::now();
    let reachable = orchestrator.is_reachable(&args.base_url).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (body, error) = match &args.path {
        Some(path) => match orchestrator
            .get_json(&args.base_url, path, CallOptions::idempotent())
            .await
        {
            Ok(body) => (Some(body), None),
            Err(err) => (None, Some(err.to_string())),
        },
        None => (None, None),
    };

    let result = ProbeOutput {
        health_url,
        reachable,
        elapsed_ms,
        body,
        error,
        stats: orchestrator.stats(),
    };
    output(&result, json_mode);

    if !result.reachable || result.error.is_some() {
        anyhow::bail!("probe of {} failed", args.base_url);
    }
    Ok(())
}
