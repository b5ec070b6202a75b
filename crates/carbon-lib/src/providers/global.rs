//! Global multi-region carbon-intensity service

use super::http::{build_client, endpoint, fetch_json, parse_base};
use super::{labels, names, IntensityProvider, ProviderError, ProviderReading};
use crate::models::RegionMetadata;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Cloud operator profile requested from the service
const DATA_CENTER_PROVIDER: &str = "aws";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestIntensity {
    carbon_intensity: Option<f64>,
    is_estimated: Option<bool>,
}

/// Per-region latest intensity from the global service
pub struct GlobalIntensityProvider {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl GlobalIntensityProvider {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }
}

#[async_trait]
impl IntensityProvider for GlobalIntensityProvider {
    fn name(&self) -> &'static str {
        names::GLOBAL_PROVIDER
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(CACHE_TTL)
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or(ProviderError::NotConfigured("global provider auth token"))?;

        let url = endpoint(&self.base_url, "carbon-intensity/latest")?;
        let request = self
            .client
            .get(url)
            .query(&[
                ("dataCenterRegion", region.region_code.as_str()),
                ("dataCenterProvider", DATA_CENTER_PROVIDER),
            ])
            .header("auth-token", token);

        let latest: LatestIntensity = fetch_json(request).await?;

        match (latest.carbon_intensity, latest.is_estimated) {
            (Some(intensity), Some(estimated)) => Ok(ProviderReading::grid(
                labels::GLOBAL_PROVIDER,
                intensity,
                !estimated,
            )),
            (None, _) => Err(ProviderError::Malformed("missing carbonIntensity".to_string())),
            (_, None) => Err(ProviderError::Malformed("missing isEstimated".to_string())),
        }
    }
}
