//! Cross-region aggregation and band classification

use crate::convert::round_to_tenth;
use crate::models::{IntensityBand, RegionIntensityRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (inclusive) of the VERY_LOW band, gCO2/kWh
pub const VERY_LOW_THRESHOLD: f64 = 25.0;
/// Upper bound (inclusive) of the LOW band
pub const LOW_THRESHOLD: f64 = 75.0;
/// Upper bound (inclusive) of the MODERATE band
pub const MODERATE_THRESHOLD: f64 = 150.0;
/// Upper bound (inclusive) of the HIGH band
pub const HIGH_THRESHOLD: f64 = 300.0;

/// Classify a datacenter intensity into its band
pub fn classify(intensity: f64) -> IntensityBand {
    if intensity <= VERY_LOW_THRESHOLD {
        IntensityBand::VeryLow
    } else if intensity <= LOW_THRESHOLD {
        IntensityBand::Low
    } else if intensity <= MODERATE_THRESHOLD {
        IntensityBand::Moderate
    } else if intensity <= HIGH_THRESHOLD {
        IntensityBand::High
    } else {
        IntensityBand::VeryHigh
    }
}

/// Headline recommendation for the cleanest region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    RunNow,
    CheckForecast,
    Defer,
}

impl Recommendation {
    /// Derive the recommendation from the lowest datacenter intensity
    pub fn for_intensity(lowest: f64) -> Self {
        if lowest <= LOW_THRESHOLD {
            Recommendation::RunNow
        } else if lowest <= MODERATE_THRESHOLD {
            Recommendation::CheckForecast
        } else {
            Recommendation::Defer
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::RunNow => "Run Now",
            Recommendation::CheckForecast => "Check Forecast",
            Recommendation::Defer => "Defer",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Statistics only defined for a non-empty record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityStats {
    pub lowest: RegionIntensityRecord,
    pub highest: RegionIntensityRecord,
    pub mean_intensity: f64,
    pub mean_classification: IntensityBand,
    pub recommendation: Recommendation,
}

/// Cross-region snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region_count: usize,
    pub low_carbon_count: usize,
    pub realtime_count: usize,
    /// `None` when there is no data to summarize
    pub stats: Option<IntensityStats>,
}

impl RegionSummary {
    pub fn has_data(&self) -> bool {
        self.stats.is_some()
    }
}

/// Summarize a set of resolved records
pub fn summarize(records: &[RegionIntensityRecord]) -> RegionSummary {
    let low_carbon_count = records
        .iter()
        .filter(|r| r.datacenter_intensity <= LOW_THRESHOLD)
        .count();
    let realtime_count = records.iter().filter(|r| r.is_realtime).count();

    let stats = records.split_first().map(|(first, rest)| {
        let mut lowest = first;
        let mut highest = first;
        let mut sum = first.datacenter_intensity;

        for record in rest {
            // strict comparisons keep the first-encountered record on ties
            if record.datacenter_intensity < lowest.datacenter_intensity {
                lowest = record;
            }
            if record.datacenter_intensity > highest.datacenter_intensity {
                highest = record;
            }
            sum += record.datacenter_intensity;
        }

        let mean_intensity = round_to_tenth(sum / records.len() as f64);
        IntensityStats {
            lowest: lowest.clone(),
            highest: highest.clone(),
            mean_intensity,
            mean_classification: classify(mean_intensity),
            recommendation: Recommendation::for_intensity(lowest.datacenter_intensity),
        }
    });

    RegionSummary {
        region_count: records.len(),
        low_carbon_count,
        realtime_count,
        stats,
    }
}
