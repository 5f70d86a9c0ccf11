//! Implementation of the `perfcore config` command.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    #[serde(flatten)]
    pub config: Config,
    #[serde(skip)]
    pub rendered: String,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        self.rendered.clone()
    }
}

pub fn execute(config: Config, json_mode: bool) -> Result<()> {
    let rendered = serde_yaml::to_string(&config).context("Failed to render configuration")?;
    output(&ConfigOutput { config, rendered }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_output_is_the_config() {
        let output = ConfigOutput {
            config: Config::default(),
            rendered: String::new(),
        };
        let json = output.to_json();

        assert_eq!(json["orchestrator"]["max_concurrent"], 3);
        assert_eq!(json["caches"]["schema"]["strategy"], "ttl");
        assert!(json.get("rendered").is_none());
    }
}
