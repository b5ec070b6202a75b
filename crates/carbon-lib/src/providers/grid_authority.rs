//! National grid authority adapter for the reference region
//!
//! Serves the current intensity plus, as side data, a 48-slot forward
//! forecast and the current generation mix. Only the current intensity is
//! required; the forecast and mix are best-effort.

use super::http::{build_client, endpoint, fetch_json, parse_base};
use super::{labels, names, IntensityProvider, ProviderError, ProviderReading, ReferenceData};
use crate::advisor::FORECAST_HORIZON_SLOTS;
use crate::models::{ForecastSlot, FuelMix, FuelShare, RegionMetadata};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct IntensityEnvelope {
    data: Vec<IntensityPeriod>,
}

#[derive(Debug, Deserialize)]
struct IntensityPeriod {
    from: Option<String>,
    to: Option<String>,
    intensity: IntensityValues,
}

#[derive(Debug, Deserialize)]
struct IntensityValues {
    forecast: Option<f64>,
    actual: Option<f64>,
    index: Option<String>,
}

/// Client for the reference grid authority
pub struct GridAuthorityProvider {
    client: Client,
    base_url: Url,
}

impl GridAuthorityProvider {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base(base_url)?,
        })
    }

    /// Current grid intensity, preferring the measured value over the forecast
    ///
    /// Returns the intensity and whether it was measured.
    pub async fn current_intensity(&self) -> Result<(f64, bool), ProviderError> {
        let url = endpoint(&self.base_url, "intensity")?;
        let envelope: IntensityEnvelope = fetch_json(self.client.get(url)).await?;

        let period = envelope
            .data
            .first()
            .ok_or_else(|| ProviderError::Malformed("empty intensity data".to_string()))?;

        match (period.intensity.actual, period.intensity.forecast) {
            (Some(actual), _) => Ok((actual, true)),
            (None, Some(forecast)) => Ok((forecast, false)),
            (None, None) => Err(ProviderError::Malformed(
                "intensity has neither actual nor forecast".to_string(),
            )),
        }
    }

    /// Forward 48-hour forecast from `from`, capped to the advisory horizon
    pub async fn forecast(&self, from: DateTime<Utc>) -> Result<Vec<ForecastSlot>, ProviderError> {
        let path = format!("intensity/{}/fw48h", from.format("%Y-%m-%dT%H:%MZ"));
        let url = endpoint(&self.base_url, &path)?;
        let envelope: IntensityEnvelope = fetch_json(self.client.get(url)).await?;

        let mut slots: Vec<ForecastSlot> = envelope
            .data
            .into_iter()
            .filter_map(|period| {
                let start_time = parse_timestamp(period.from.as_deref()?)?;
                let end_time = parse_timestamp(period.to.as_deref()?)?;
                Some(ForecastSlot {
                    start_time,
                    end_time,
                    grid_intensity: period.intensity.forecast?,
                    datacenter_intensity: None,
                    index: period.intensity.index,
                })
            })
            .collect();

        if slots.is_empty() {
            return Err(ProviderError::Malformed("forecast contained no usable slots".to_string()));
        }

        slots.sort_by_key(|slot| slot.start_time);
        slots.truncate(FORECAST_HORIZON_SLOTS);
        Ok(slots)
    }

    /// Current generation mix
    pub async fn fuel_mix(&self) -> Result<FuelMix, ProviderError> {
        let url = endpoint(&self.base_url, "generation")?;
        let body: Value = fetch_json(self.client.get(url)).await?;
        parse_generation_mix(&body)
    }
}

#[async_trait]
impl IntensityProvider for GridAuthorityProvider {
    fn name(&self) -> &'static str {
        names::GRID_AUTHORITY
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(CACHE_TTL)
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        let (intensity, measured) = self.current_intensity().await?;

        let forecast = self.forecast(Utc::now()).await.unwrap_or_else(|e| {
            debug!(region = %region.region_code, error = %e, "Forecast unavailable");
            Vec::new()
        });

        let fuel_mix = match self.fuel_mix().await {
            Ok(mix) => Some(mix),
            Err(e) => {
                debug!(region = %region.region_code, error = %e, "Fuel mix unavailable");
                None
            }
        };

        let mut reading = ProviderReading::grid(labels::GRID_AUTHORITY, intensity, measured);
        reading.reference = Some(ReferenceData { forecast, fuel_mix });
        Ok(reading)
    }
}

/// Parse the authority's minute-precision timestamps (`2024-03-01T12:30Z`)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Accept both `data.generationmix` and `data[0].generationmix`
fn parse_generation_mix(body: &Value) -> Result<FuelMix, ProviderError> {
    let data = body
        .get("data")
        .ok_or_else(|| ProviderError::Malformed("generation response has no data".to_string()))?;
    let container = if data.is_array() { data.get(0) } else { Some(data) };

    let mix = container
        .and_then(|c| c.get("generationmix"))
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Malformed("generation response has no generationmix".to_string()))?;

    let shares = mix
        .iter()
        .filter_map(|entry| {
            Some(FuelShare {
                fuel: entry.get("fuel")?.as_str()?.to_string(),
                percent: entry.get("perc")?.as_f64()?,
            })
        })
        .collect();

    let timestamp = |field: &str| {
        container
            .and_then(|c| c.get(field))
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    };

    Ok(FuelMix {
        from: timestamp("from"),
        to: timestamp("to"),
        shares,
    })
}
