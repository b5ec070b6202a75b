//! Core data models for the carbon region advisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete severity band derived from a datacenter intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntensityBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl IntensityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityBand::VeryLow => "VERY_LOW",
            IntensityBand::Low => "LOW",
            IntensityBand::Moderate => "MODERATE",
            IntensityBand::High => "HIGH",
            IntensityBand::VeryHigh => "VERY_HIGH",
        }
    }
}

impl fmt::Display for IntensityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for a monitored cloud region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetadata {
    pub region_code: String,
    pub location: String,
    /// ISO 3166 alpha-3 country code
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Cloud operator's purchased renewable share, if known
    #[serde(default)]
    pub renewable_fraction: Option<f64>,
}

/// Resolved carbon intensity for one region in one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionIntensityRecord {
    pub region_code: String,
    pub location: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub renewable_fraction: f64,
    /// Raw grid signal, gCO2/kWh
    pub grid_intensity: f64,
    /// Renewable- and PUE-adjusted intensity, gCO2/kWh, one decimal
    pub datacenter_intensity: f64,
    pub classification: IntensityBand,
    /// Label of the provider that answered
    pub source: String,
    pub is_realtime: bool,
    pub resolved_at: DateTime<Utc>,
}

/// One forecast point for the reference region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub grid_intensity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter_intensity: Option<f64>,
    /// Provider's qualitative index (e.g. "moderate")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// Share of one fuel type in the reference grid's generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelShare {
    pub fuel: String,
    pub percent: f64,
}

/// Generation mix reported by the reference grid authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMix {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    pub shares: Vec<FuelShare>,
}

/// Where the advisor recommends running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisoryTarget {
    Now,
    Slot(ForecastSlot),
}

/// Output of the time-shift advisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryDecision {
    pub should_wait: bool,
    pub target: AdvisoryTarget,
    pub expected_savings_percent: f64,
    pub wait_duration_minutes: i64,
    pub current_intensity: f64,
    pub target_intensity: f64,
}

/// Advisor result, distinguishing a missing forecast from a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvisoryOutcome {
    NoForecastAvailable { region_code: String },
    Decision(AdvisoryDecision),
}

/// Estimated footprint of a hypothetical workload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadEstimate {
    pub energy_kwh: f64,
    pub operational_grams_co2: f64,
    pub embodied_grams_co2: f64,
    /// SCI score for one run of the workload
    pub total_grams_co2: f64,
}
