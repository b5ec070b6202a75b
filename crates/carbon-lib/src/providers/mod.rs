//! Carbon-intensity provider adapters
//!
//! Each adapter answers "what is the carbon intensity for this region" from
//! one external (or embedded) source. Adapters own their own timeouts and
//! report every failure as a [`ProviderError`]; the resolver decides what to
//! do next.

mod climate_data;
mod country_table;
mod global;
mod global_regions;
mod grid_authority;
mod http;

pub use climate_data::ClimateDataProvider;
pub use country_table::{country_baseline, CountryTableProvider, DEFAULT_JITTER};
pub use global::GlobalIntensityProvider;
pub use global_regions::{global_region_entry, GlobalRegionEntry, GlobalRegionsProvider};
pub use grid_authority::GridAuthorityProvider;

use crate::models::{ForecastSlot, FuelMix, RegionMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Provider names, used for cache keys, metrics labels and health components
pub mod names {
    pub const GRID_AUTHORITY: &str = "grid_authority";
    pub const GLOBAL_PROVIDER: &str = "global_provider";
    pub const GLOBAL_REGIONS: &str = "global_regions";
    pub const CLIMATE_DATA: &str = "climate_data";
    pub const COUNTRY_TABLE: &str = "country_table";
}

/// Source labels written into resolved records
pub mod labels {
    pub const GRID_AUTHORITY: &str = "UK Carbon Intensity API";
    pub const GLOBAL_PROVIDER: &str = "Electricity Maps";
    pub const GLOBAL_REGIONS: &str = "Global Regions Table (static)";
    pub const CLIMATE_DATA: &str = "Ember Yearly";
    pub const COUNTRY_TABLE: &str = "Country Baseline (static, jittered estimate)";
    pub const FALLBACK: &str = "Fallback";
}

/// Reasons a provider could not answer
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no data for {0}")]
    NoData(String),

    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ProviderError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Transport(e) if e.is_timeout() => "timeout",
            ProviderError::Transport(_) => "transport",
            ProviderError::Status { .. } => "status",
            ProviderError::Malformed(_) => "malformed",
            ProviderError::NoData(_) => "no_data",
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// Extra data only the reference grid authority provides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub forecast: Vec<ForecastSlot>,
    pub fuel_mix: Option<FuelMix>,
}

/// A successful provider answer, before conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReading {
    pub grid_intensity: Option<f64>,
    /// Present only when the provider publishes an authoritative adjusted value
    pub datacenter_intensity: Option<f64>,
    pub is_realtime: bool,
    pub source: String,
    pub reference: Option<ReferenceData>,
}

impl ProviderReading {
    pub fn grid(source: &str, grid_intensity: f64, is_realtime: bool) -> Self {
        Self {
            grid_intensity: Some(grid_intensity),
            datacenter_intensity: None,
            is_realtime,
            source: source.to_string(),
            reference: None,
        }
    }

    /// Whether the reading may be reused from cache
    ///
    /// A reference reading whose forecast or fuel mix call failed is served
    /// once but not cached, so the side data is retried on the next cycle.
    pub fn is_cacheable(&self) -> bool {
        self.reference
            .as_ref()
            .map_or(true, |r| !r.forecast.is_empty() && r.fuel_mix.is_some())
    }
}

/// Uniform "fetch intensity for region" capability
#[async_trait]
pub trait IntensityProvider: Send + Sync {
    /// Stable provider name
    fn name(&self) -> &'static str;

    /// How long a successful reading may be reused; `None` disables caching
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }

    /// Fetch the current intensity for a region
    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError>;
}

/// Connection settings for all adapters
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_grid_authority_url")]
    pub grid_authority_url: String,
    #[serde(default = "default_global_provider_url")]
    pub global_provider_url: String,
    #[serde(default)]
    pub global_provider_token: Option<String>,
    #[serde(default = "default_climate_data_url")]
    pub climate_data_url: String,
    #[serde(default)]
    pub climate_data_key: Option<String>,
    /// Per-request timeout, seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Relative jitter applied to the static country table (0 disables)
    #[serde(default = "default_jitter")]
    pub static_jitter: f64,
}

fn default_grid_authority_url() -> String {
    "https://api.carbonintensity.org.uk".to_string()
}

fn default_global_provider_url() -> String {
    "https://api.electricitymap.org/v3".to_string()
}

fn default_climate_data_url() -> String {
    "https://api.ember-energy.org/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            grid_authority_url: default_grid_authority_url(),
            global_provider_url: default_global_provider_url(),
            global_provider_token: None,
            climate_data_url: default_climate_data_url(),
            climate_data_key: None,
            timeout_secs: default_timeout_secs(),
            static_jitter: default_jitter(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The five cascade steps, in priority order
#[derive(Clone)]
pub struct ProviderSet {
    pub grid_authority: Arc<dyn IntensityProvider>,
    pub global: Arc<dyn IntensityProvider>,
    pub global_regions: Arc<dyn IntensityProvider>,
    pub climate_data: Arc<dyn IntensityProvider>,
    pub country_table: Arc<dyn IntensityProvider>,
}

impl ProviderSet {
    /// Build the live adapters from settings
    pub fn from_settings(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let timeout = settings.timeout();
        Ok(Self {
            grid_authority: Arc::new(GridAuthorityProvider::new(
                &settings.grid_authority_url,
                timeout,
            )?),
            global: Arc::new(GlobalIntensityProvider::new(
                &settings.global_provider_url,
                settings.global_provider_token.clone(),
                timeout,
            )?),
            global_regions: Arc::new(GlobalRegionsProvider::new()),
            climate_data: Arc::new(ClimateDataProvider::new(
                &settings.climate_data_url,
                settings.climate_data_key.clone(),
                timeout,
            )?),
            country_table: Arc::new(CountryTableProvider::new(settings.static_jitter)),
        })
    }

    /// Adapters to try for a region, in order
    pub fn cascade(&self, is_reference: bool) -> Vec<&dyn IntensityProvider> {
        let mut steps: Vec<&dyn IntensityProvider> = Vec::with_capacity(5);
        if is_reference {
            steps.push(self.grid_authority.as_ref());
        }
        steps.push(self.global.as_ref());
        steps.push(self.global_regions.as_ref());
        steps.push(self.climate_data.as_ref());
        steps.push(self.country_table.as_ref());
        steps
    }
}
