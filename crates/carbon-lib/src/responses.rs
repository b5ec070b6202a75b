//! JSON bodies served by the agent API and read by the CLI

use crate::accounting::WorkloadSpec;
use crate::aggregate::RegionSummary;
use crate::models::{ForecastSlot, RegionIntensityRecord, WorkloadEstimate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsResponse {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub regions: Vec<RegionIntensityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub summary: RegionSummary,
    pub source_tally: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub region_code: String,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub slots: Vec<ForecastSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub region_code: String,
    /// Datacenter intensity the estimate was computed with
    pub intensity: f64,
    pub workload: WorkloadSpec,
    pub estimate: WorkloadEstimate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
