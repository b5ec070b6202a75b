//! Shared region table
//!
//! Readers take an `Arc` to the latest snapshot and never block the refresh
//! cycle for longer than the pointer swap.

use crate::aggregate::{summarize, RegionSummary};
use crate::models::{ForecastSlot, FuelMix, RegionIntensityRecord};
use crate::resolver::Resolution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Region table state after one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionTableSnapshot {
    /// One record per configured region, in configured order
    pub records: Vec<RegionIntensityRecord>,
    /// Reference region forecast, datacenter-adjusted; empty when unavailable
    pub forecast: Vec<ForecastSlot>,
    pub fuel_mix: Option<FuelMix>,
    /// Number of regions answered by each source label
    pub source_tally: BTreeMap<String, usize>,
    /// `None` until the first refresh completes
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl RegionTableSnapshot {
    /// Merge one cycle's resolutions into a snapshot
    ///
    /// Forecast and fuel mix are replaced wholesale: a cycle where the
    /// reference provider did not supply them leaves them empty.
    pub fn from_resolutions(resolutions: Vec<Resolution>, refreshed_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            refreshed_at: Some(refreshed_at),
            ..Self::default()
        };

        for resolution in resolutions {
            *snapshot
                .source_tally
                .entry(resolution.record.source.clone())
                .or_insert(0) += 1;

            if let Some(forecast) = resolution.forecast {
                if snapshot.forecast.is_empty() {
                    snapshot.forecast = forecast;
                }
            }
            if snapshot.fuel_mix.is_none() {
                snapshot.fuel_mix = resolution.fuel_mix;
            }
            snapshot.records.push(resolution.record);
        }

        snapshot
    }

    pub fn record(&self, region_code: &str) -> Option<&RegionIntensityRecord> {
        self.records.iter().find(|r| r.region_code == region_code)
    }

    pub fn summary(&self) -> RegionSummary {
        summarize(&self.records)
    }

    pub fn is_populated(&self) -> bool {
        self.refreshed_at.is_some()
    }
}

/// Latest snapshot behind a lock held only for the swap
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    inner: Arc<RwLock<Arc<RegionTableSnapshot>>>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<RegionTableSnapshot> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, snapshot: RegionTableSnapshot) {
        *self.inner.write().await = Arc::new(snapshot);
    }
}
