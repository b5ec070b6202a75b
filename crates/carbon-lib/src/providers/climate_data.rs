//! By-country yearly intensity from the climate-data service

use super::http::{build_client, endpoint, fetch_json, parse_base};
use super::{labels, names, IntensityProvider, ProviderError, ProviderReading};
use crate::models::RegionMetadata;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Yearly figures change rarely; a day is plenty
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Deserialize)]
struct YearlyEnvelope {
    data: Vec<YearlyEntry>,
}

#[derive(Debug, Deserialize)]
struct YearlyEntry {
    emissions_intensity_gco2_per_kwh: Option<f64>,
}

pub struct ClimateDataProvider {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ClimateDataProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base(base_url)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl IntensityProvider for ClimateDataProvider {
    fn name(&self) -> &'static str {
        names::CLIMATE_DATA
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(CACHE_TTL)
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("climate data API key"))?;

        let start_year = (Utc::now().year() - 1).to_string();
        let url = endpoint(&self.base_url, "carbon-intensity/yearly")?;
        let request = self.client.get(url).query(&[
            ("entity_code", region.country_code.as_str()),
            ("start_date", start_year.as_str()),
            ("api_key", api_key),
        ]);

        let envelope: YearlyEnvelope = fetch_json(request).await?;

        // only the most recent year counts
        let latest = envelope
            .data
            .last()
            .ok_or_else(|| ProviderError::NoData(region.country_code.clone()))?;
        let intensity = latest.emissions_intensity_gco2_per_kwh.ok_or_else(|| {
            ProviderError::Malformed("missing emissions_intensity_gco2_per_kwh".to_string())
        })?;

        Ok(ProviderReading::grid(labels::CLIMATE_DATA, intensity, false))
    }
}
