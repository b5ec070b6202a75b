//! Per-region source cascade
//!
//! Tries the provider adapters in a fixed priority order and returns the first
//! answer, normalized into a [`RegionIntensityRecord`]. Failures are logged and
//! counted, never returned: a region that exhausts every provider receives the
//! hard-fallback record.
//!
//! Side data from the reference grid authority (forecast, fuel mix) is handed
//! back in the [`Resolution`] rather than written anywhere, so the caller can
//! merge it once every region has settled.


use crate::aggregate::classify;
use crate::cache::CacheStore;
use crate::convert::{datacenter_to_grid, effective_renewable_fraction, grid_to_datacenter, reconcile};
use crate::models::{ForecastSlot, FuelMix, IntensityBand, RegionIntensityRecord, RegionMetadata};
use crate::observability::CarbonMetrics;
use crate::providers::{labels, IntensityProvider, ProviderError, ProviderReading, ProviderSet};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Datacenter intensity used when every provider fails
pub const FALLBACK_INTENSITY: f64 = 300.0;

/// One provider that failed during a resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: &'static str,
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of resolving one region
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: RegionIntensityRecord,
    /// Reference forecast with datacenter values filled in
    pub forecast: Option<Vec<ForecastSlot>>,
    pub fuel_mix: Option<FuelMix>,
    /// Name of the provider that answered; `None` for the hard fallback
    pub answered_by: Option<&'static str>,
    pub failures: Vec<ProviderFailure>,
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        self.answered_by.is_none()
    }
}

/// Resolves regions through the provider cascade
pub struct SourceResolver {
    providers: ProviderSet,
    reference_region: String,
    cache: Arc<CacheStore<ProviderReading>>,
    metrics: CarbonMetrics,
}

impl SourceResolver {
    pub fn new(providers: ProviderSet, reference_region: impl Into<String>) -> Self {
        Self {
            providers,
            reference_region: reference_region.into(),
            cache: Arc::new(CacheStore::new()),
            metrics: CarbonMetrics::new(),
        }
    }

    /// Share an existing cache
    pub fn with_cache(mut self, cache: Arc<CacheStore<ProviderReading>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn reference_region(&self) -> &str {
        &self.reference_region
    }

    pub fn is_reference(&self, region_code: &str) -> bool {
        region_code == self.reference_region
    }

    pub fn cache(&self) -> &CacheStore<ProviderReading> {
        &self.cache
    }

    /// Renewable fraction used for a region's conversions
    pub fn renewable_fraction(&self, region: &RegionMetadata) -> f64 {
        effective_renewable_fraction(region.renewable_fraction, self.is_reference(&region.region_code))
    }

    /// Resolve one region; always produces a record
    pub async fn resolve(&self, region: &RegionMetadata) -> Resolution {
        let renewable_fraction = self.renewable_fraction(region);
        let mut failures = Vec::new();

        for provider in self.providers.cascade(self.is_reference(&region.region_code)) {
            let reading = match self.fetch_with_cache(provider, region).await {
                Ok(reading) => reading,
                Err(e) => {
                    self.record_failure(&mut failures, provider.name(), region, &e);
                    continue;
                }
            };

            let Some((grid, datacenter)) = reconcile(
                reading.grid_intensity,
                reading.datacenter_intensity,
                renewable_fraction,
            ) else {
                let e = ProviderError::Malformed("reading carried no intensity".to_string());
                self.record_failure(&mut failures, provider.name(), region, &e);
                continue;
            };

            debug!(
                region = %region.region_code,
                provider = provider.name(),
                datacenter_intensity = datacenter,
                realtime = reading.is_realtime,
                "Region resolved"
            );

            let record = build_record(
                region,
                renewable_fraction,
                grid,
                datacenter,
                classify(datacenter),
                &reading.source,
                reading.is_realtime,
                Utc::now(),
            );

            let (forecast, fuel_mix) = match reading.reference {
                Some(reference) => {
                    let forecast = with_datacenter_values(reference.forecast, renewable_fraction);
                    ((!forecast.is_empty()).then_some(forecast), reference.fuel_mix)
                }
                None => (None, None),
            };

            return Resolution {
                record,
                forecast,
                fuel_mix,
                answered_by: Some(provider.name()),
                failures,
            };
        }

        let mut resolution = self.fallback_resolution(region);
        resolution.failures = failures;
        resolution
    }

    /// Hard-fallback resolution for a region
    pub fn fallback_resolution(&self, region: &RegionMetadata) -> Resolution {
        let renewable_fraction = self.renewable_fraction(region);
        self.metrics.inc_fallback_records();

        Resolution {
            record: build_record(
                region,
                renewable_fraction,
                datacenter_to_grid(FALLBACK_INTENSITY, renewable_fraction),
                FALLBACK_INTENSITY,
                IntensityBand::Moderate,
                labels::FALLBACK,
                false,
                Utc::now(),
            ),
            forecast: None,
            fuel_mix: None,
            answered_by: None,
            failures: Vec::new(),
        }
    }

    async fn fetch_with_cache(
        &self,
        provider: &dyn IntensityProvider,
        region: &RegionMetadata,
    ) -> Result<ProviderReading, ProviderError> {
        let name = provider.name();
        let ttl = provider.cache_ttl();
        let key = CacheStore::<ProviderReading>::key(name, &region.region_code);

        if ttl.is_some() {
            if let Some(reading) = self.cache.get(&key) {
                debug!(region = %region.region_code, provider = name, "Cache hit");
                self.metrics.inc_cache_hit(name);
                return Ok(reading);
            }
            self.metrics.inc_cache_miss(name);
        }

        let start = Instant::now();
        let result = provider.fetch(region).await;
        self.metrics
            .observe_provider_latency(name, start.elapsed().as_secs_f64());

        if let (Ok(reading), Some(ttl)) = (&result, ttl) {
            if reading.is_cacheable() {
                self.cache.insert(key, reading.clone(), ttl);
            }
        }
        result
    }

    fn record_failure(
        &self,
        failures: &mut Vec<ProviderFailure>,
        provider: &'static str,
        region: &RegionMetadata,
        error: &ProviderError,
    ) {
        debug!(
            region = %region.region_code,
            provider = provider,
            error = %error,
            "Provider failed, trying next source"
        );
        self.metrics.inc_provider_failure(provider, error.kind());
        failures.push(ProviderFailure {
            provider,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    region: &RegionMetadata,
    renewable_fraction: f64,
    grid_intensity: f64,
    datacenter_intensity: f64,
    classification: IntensityBand,
    source: &str,
    is_realtime: bool,
    resolved_at: DateTime<Utc>,
) -> RegionIntensityRecord {
    RegionIntensityRecord {
        region_code: region.region_code.clone(),
        location: region.location.clone(),
        country_code: region.country_code.clone(),
        latitude: region.latitude,
        longitude: region.longitude,
        renewable_fraction,
        grid_intensity,
        datacenter_intensity,
        classification,
        source: source.to_string(),
        is_realtime,
        resolved_at,
    }
}

fn with_datacenter_values(forecast: Vec<ForecastSlot>, renewable_fraction: f64) -> Vec<ForecastSlot> {
    forecast
        .into_iter()
        .map(|mut slot| {
            slot.datacenter_intensity = Some(grid_to_datacenter(slot.grid_intensity, renewable_fraction));
            slot
        })
        .collect()
}
