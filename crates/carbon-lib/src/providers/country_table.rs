//! Embedded static by-country baseline table
//!
//! Last live-ish resort before the hard fallback. Values are annual grid
//! averages; a relative jitter is applied so that several regions in the same
//! country do not render as an identical flat line. The jittered value is
//! labelled as an estimate and never reported as real-time.

use super::{labels, names, IntensityProvider, ProviderError, ProviderReading};
use crate::models::RegionMetadata;
use async_trait::async_trait;
use rand::Rng;

/// Default relative jitter (±15%)
pub const DEFAULT_JITTER: f64 = 0.15;

/// Baseline grid intensity for an ISO alpha-3 country code, gCO2/kWh
pub fn country_baseline(country_code: &str) -> Option<f64> {
    let value = match country_code.to_ascii_uppercase().as_str() {
        "USA" => 369.0,
        "CAN" => 128.0,
        "BRA" => 98.0,
        "GBR" => 238.0,
        "IRL" => 296.0,
        "FRA" => 56.0,
        "DEU" => 381.0,
        "ITA" => 372.0,
        "ESP" => 174.0,
        "SWE" => 41.0,
        "NOR" => 30.0,
        "CHE" => 46.0,
        "JPN" => 485.0,
        "KOR" => 436.0,
        "CHN" => 582.0,
        "HKG" => 640.0,
        "SGP" => 470.0,
        "IND" => 713.0,
        "AUS" => 549.0,
        "IDN" => 676.0,
        "ZAF" => 709.0,
        "BHR" => 505.0,
        "ARE" => 428.0,
        "ISR" => 507.0,
        _ => return None,
    };
    Some(value)
}

pub struct CountryTableProvider {
    jitter: f64,
}

impl CountryTableProvider {
    /// `jitter` is the relative amplitude; it is clamped to `[0, 0.5]`
    pub fn new(jitter: f64) -> Self {
        let jitter = if jitter.is_finite() { jitter.clamp(0.0, 0.5) } else { 0.0 };
        Self { jitter }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn jittered(&self, baseline: f64) -> f64 {
        if self.jitter == 0.0 {
            return baseline;
        }
        let factor = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        (baseline * (1.0 + factor)).round()
    }
}

impl Default for CountryTableProvider {
    fn default() -> Self {
        Self::new(DEFAULT_JITTER)
    }
}

#[async_trait]
impl IntensityProvider for CountryTableProvider {
    fn name(&self) -> &'static str {
        names::COUNTRY_TABLE
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        let baseline = country_baseline(&region.country_code)
            .ok_or_else(|| ProviderError::NoData(region.country_code.clone()))?;
        Ok(ProviderReading::grid(
            labels::COUNTRY_TABLE,
            self.jittered(baseline),
            false,
        ))
    }
}
