//! In-memory providers shared by the resolver and refresh tests

use crate::models::RegionMetadata;
use crate::providers::{
    names, IntensityProvider, ProviderError, ProviderReading, ProviderSet,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Provider answering from a fixed region -> reading map
///
/// Regions without a scripted reading fail with a 503.
pub(crate) struct ScriptedProvider {
    name: &'static str,
    ttl: Option<Duration>,
    readings: HashMap<String, ProviderReading>,
    panics_for: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            ttl: None,
            readings: HashMap::new(),
            panics_for: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub(crate) fn answering(mut self, region: &str, reading: ProviderReading) -> Self {
        self.readings.insert(region.to_string(), reading);
        self
    }

    pub(crate) fn panicking_for(mut self, region: &str) -> Self {
        self.panics_for = Some(region.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntensityProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cache_ttl(&self) -> Option<Duration> {
        self.ttl
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics_for.as_deref() == Some(region.region_code.as_str()) {
            panic!("scripted provider panic for {}", region.region_code);
        }
        self.readings
            .get(&region.region_code)
            .cloned()
            .ok_or(ProviderError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
    }
}

/// Every cascade step scripted; nothing answers unless told to
pub(crate) fn scripted_set(
    grid_authority: Arc<ScriptedProvider>,
    global: Arc<ScriptedProvider>,
) -> ProviderSet {
    ProviderSet {
        grid_authority,
        global,
        global_regions: Arc::new(ScriptedProvider::new(names::GLOBAL_REGIONS)),
        climate_data: Arc::new(ScriptedProvider::new(names::CLIMATE_DATA)),
        country_table: Arc::new(ScriptedProvider::new(names::COUNTRY_TABLE)),
    }
}

pub(crate) fn region(code: &str, country: &str, renewable_fraction: Option<f64>) -> RegionMetadata {
    RegionMetadata {
        region_code: code.to_string(),
        location: format!("{} location", code),
        country_code: country.to_string(),
        latitude: 0.0,
        longitude: 0.0,
        renewable_fraction,
    }
}
