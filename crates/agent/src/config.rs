//! Agent configuration

use anyhow::{bail, Context, Result};
use carbon_lib::advisor::AdvisorThresholds;
use carbon_lib::models::RegionMetadata;
use carbon_lib::providers::ProviderSettings;
use carbon_lib::refresh::RefreshConfig;
use carbon_lib::regions::{default_regions, find_region, DEFAULT_REFERENCE_REGION};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
///
/// Read from an optional `carbon-agent.toml` and `CARBON_*` environment
/// variables; nested keys use `__`, e.g. `CARBON_PROVIDERS__GLOBAL_PROVIDER_TOKEN`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Refresh interval in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Maximum random delay added to each refresh interval, seconds
    #[serde(default = "default_refresh_jitter")]
    pub refresh_jitter_secs: u64,

    /// Region served by the national grid authority
    #[serde(default = "default_reference_region")]
    pub reference_region: String,

    #[serde(default)]
    pub providers: ProviderSettings,

    #[serde(default)]
    pub advisor: AdvisorThresholds,

    /// Replaces the built-in region table when set
    #[serde(default)]
    pub regions: Option<Vec<RegionMetadata>>,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "carbon-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_refresh_jitter() -> u64 {
    5
}

fn default_reference_region() -> String {
    DEFAULT_REFERENCE_REGION.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            api_port: default_api_port(),
            refresh_interval_secs: default_refresh_interval(),
            refresh_jitter_secs: default_refresh_jitter(),
            reference_region: default_reference_region(),
            providers: ProviderSettings::default(),
            advisor: AdvisorThresholds::default(),
            regions: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("carbon-agent").required(false))
            .add_source(
                config::Environment::with_prefix("CARBON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read agent configuration")?;

        let config: AgentConfig = config
            .try_deserialize()
            .context("Invalid agent configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Configured regions, or the built-in table
    pub fn regions(&self) -> Vec<RegionMetadata> {
        self.regions.clone().unwrap_or_else(default_regions)
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: Duration::from_secs(self.refresh_interval_secs),
            jitter: Duration::from_secs(self.refresh_jitter_secs),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        let regions = self.regions();
        if regions.is_empty() {
            bail!("at least one region must be configured");
        }
        if find_region(&regions, &self.reference_region).is_none() {
            bail!(
                "reference region {} is not in the region table",
                self.reference_region
            );
        }
        Ok(())
    }
}
