use std::{path::Path, time::Duration};

use anyhow::Context;
use lumen::{IngestOptions, PlaylistIngestor};
use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings read from the `--config` file. Command line flags win over them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestOptions,
    /// Request timeout for playlist downloads
    pub timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn ingestor(&self) -> anyhow::Result<PlaylistIngestor> {
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Ok(PlaylistIngestor::with_timeout(timeout)?)
    }

    /// Merge flags given on the command line over the configured defaults.
    pub fn ingest_options(
        &self,
        user_agent: Option<String>,
        decrypt_recipe: Option<String>,
    ) -> IngestOptions {
        IngestOptions {
            user_agent: user_agent.or_else(|| self.ingest.user_agent.clone()),
            decrypt_recipe: decrypt_recipe.or_else(|| self.ingest.decrypt_recipe.clone()),
        }
    }
}
