//! Pre-computed global regions reference table
//!
//! Periodically compiled grid averages for regions outside the live
//! providers' reach. Treated as static, lower-confidence data.

use super::{labels, names, IntensityProvider, ProviderError, ProviderReading};
use crate::models::RegionMetadata;
use async_trait::async_trait;

/// One row of the reference table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalRegionEntry {
    pub region_code: &'static str,
    pub grid_intensity: f64,
    /// Published datacenter-adjusted figure, authoritative when present
    pub datacenter_intensity: Option<f64>,
}

const fn entry(
    region_code: &'static str,
    grid_intensity: f64,
    datacenter_intensity: Option<f64>,
) -> GlobalRegionEntry {
    GlobalRegionEntry {
        region_code,
        grid_intensity,
        datacenter_intensity,
    }
}

static GLOBAL_REGIONS: &[GlobalRegionEntry] = &[
    entry("us-east-2", 560.0, None),
    entry("us-west-1", 210.0, Some(50.1)),
    entry("ca-central-1", 32.0, Some(8.6)),
    entry("sa-east-1", 98.0, None),
    entry("eu-west-3", 56.0, Some(15.3)),
    entry("eu-south-1", 372.0, None),
    entry("eu-central-2", 46.0, None),
    entry("ap-south-1", 713.0, None),
    entry("ap-southeast-1", 470.0, None),
    entry("ap-northeast-2", 436.0, None),
    entry("ap-east-1", 640.0, None),
    entry("af-south-1", 709.0, None),
    entry("me-south-1", 505.0, None),
];

/// Look up a region in the reference table
pub fn global_region_entry(region_code: &str) -> Option<&'static GlobalRegionEntry> {
    GLOBAL_REGIONS.iter().find(|e| e.region_code == region_code)
}

/// Adapter over the embedded reference table
#[derive(Debug, Default)]
pub struct GlobalRegionsProvider;

impl GlobalRegionsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntensityProvider for GlobalRegionsProvider {
    fn name(&self) -> &'static str {
        names::GLOBAL_REGIONS
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        let entry = global_region_entry(&region.region_code)
            .ok_or_else(|| ProviderError::NoData(region.region_code.clone()))?;

        let mut reading = ProviderReading::grid(labels::GLOBAL_REGIONS, entry.grid_intensity, false);
        reading.datacenter_intensity = entry.datacenter_intensity;
        Ok(reading)
    }
}
