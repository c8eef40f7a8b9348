use anyhow::{Context, Result};
use purgekit_engine::PurgeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;

const APP_NAME: &str = "purgekit";
const LAST_REPORT_FILE: &str = "last-purge.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: OutputFormat,

    /// Enable colored output
    pub colored_output: bool,

    /// Backend settings: `[edge]`, `[object]`, `[cdn]`, `[timeouts]`, `[result_store]`
    #[serde(flatten)]
    pub purge: PurgeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: OutputFormat::Pretty,
            colored_output: true,
            purge: PurgeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Use confy for default location
                confy::load(APP_NAME, None).context("Failed to load configuration")
            }
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// The file actually in use for `config_path`
    pub fn resolve_path(config_path: Option<&Path>) -> Option<PathBuf> {
        config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = Self::resolve_path(config_path).context("No configuration path available")?;

        let default_config = Self::default();
        default_config.save(&path)?;

        Ok(())
    }

    /// Show current configuration as a formatted string, API key masked
    pub fn show(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.purge.cdn.api_key.is_empty() {
            shown.purge.cdn.api_key = "********".to_string();
        }
        toml::to_string_pretty(&shown).context("Failed to serialize configuration for display")
    }

    /// Command-line and environment credentials win over the file
    pub fn apply_cdn_overrides(
        &mut self,
        email: Option<String>,
        api_key: Option<String>,
        zone_id: Option<String>,
    ) {
        let cdn = &mut self.purge.cdn;
        if let Some(email) = email {
            cdn.email = email;
        }
        if let Some(api_key) = api_key {
            cdn.api_key = api_key;
        }
        if let Some(zone_id) = zone_id {
            cdn.zone_id = zone_id;
        }
    }

    /// Engine configuration with the last report kept next to the config file
    /// unless a location is set, so `last` works across invocations
    pub fn engine_config(&self, config_path: Option<&Path>) -> PurgeConfig {
        let mut purge = self.purge.clone();
        if purge.result_store.path.is_none() {
            purge.result_store.path = Self::resolve_path(config_path)
                .as_deref()
                .and_then(Path::parent)
                .map(|dir| dir.join(LAST_REPORT_FILE));
        }
        purge
    }
}
