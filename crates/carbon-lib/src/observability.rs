//! Observability infrastructure for the carbon advisor
//!
//! Provides:
//! - Prometheus metrics (refresh latency, provider latency and failures, cache
//!   effectiveness, per-region intensity)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, register_int_gauge_vec, GaugeVec, Histogram,
    HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for outbound provider requests and refresh cycles (seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CarbonMetricsInner> = OnceLock::new();

struct CarbonMetricsInner {
    refresh_latency_seconds: Histogram,
    refreshes_skipped: IntCounter,
    provider_latency_seconds: HistogramVec,
    provider_failures: IntCounterVec,
    cache_hits: IntCounterVec,
    cache_misses: IntCounterVec,
    fallback_records: IntCounter,
    region_intensity: GaugeVec,
    regions_by_source: IntGaugeVec,
    low_carbon_regions: IntGauge,
}

impl CarbonMetricsInner {
    fn new() -> Self {
        Self {
            refresh_latency_seconds: register_histogram!(
                "carbon_refresh_latency_seconds",
                "Time spent resolving every configured region in one refresh cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register refresh_latency_seconds"),

            refreshes_skipped: register_int_counter!(
                "carbon_refreshes_skipped_total",
                "Refresh triggers skipped because a cycle was already running"
            )
            .expect("Failed to register refreshes_skipped"),

            provider_latency_seconds: register_histogram_vec!(
                "carbon_provider_latency_seconds",
                "Latency of provider fetches",
                &["provider"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register provider_latency_seconds"),

            provider_failures: register_int_counter_vec!(
                "carbon_provider_failures_total",
                "Provider fetches that failed and advanced the cascade",
                &["provider", "kind"]
            )
            .expect("Failed to register provider_failures"),

            cache_hits: register_int_counter_vec!(
                "carbon_cache_hits_total",
                "Provider readings served from cache",
                &["provider"]
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_counter_vec!(
                "carbon_cache_misses_total",
                "Provider readings not found in cache",
                &["provider"]
            )
            .expect("Failed to register cache_misses"),

            fallback_records: register_int_counter!(
                "carbon_fallback_records_total",
                "Regions that exhausted every provider"
            )
            .expect("Failed to register fallback_records"),

            region_intensity: register_gauge_vec!(
                "carbon_region_datacenter_intensity",
                "Latest datacenter-adjusted intensity per region (gCO2/kWh)",
                &["region"]
            )
            .expect("Failed to register region_intensity"),

            regions_by_source: register_int_gauge_vec!(
                "carbon_regions_by_source",
                "Regions resolved by each source in the latest cycle",
                &["source"]
            )
            .expect("Failed to register regions_by_source"),

            low_carbon_regions: register_int_gauge!(
                "carbon_low_carbon_regions",
                "Regions at or below the LOW threshold in the latest cycle"
            )
            .expect("Failed to register low_carbon_regions"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics
#[derive(Clone)]
pub struct CarbonMetrics {
    _private: (),
}

impl Default for CarbonMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CarbonMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CarbonMetrics")
    }
}

impl CarbonMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CarbonMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CarbonMetricsInner {
        GLOBAL_METRICS.get_or_init(CarbonMetricsInner::new)
    }

    pub fn observe_refresh_latency(&self, duration_secs: f64) {
        self.inner().refresh_latency_seconds.observe(duration_secs);
    }

    pub fn inc_refreshes_skipped(&self) {
        self.inner().refreshes_skipped.inc();
    }

    pub fn observe_provider_latency(&self, provider: &str, duration_secs: f64) {
        self.inner()
            .provider_latency_seconds
            .with_label_values(&[provider])
            .observe(duration_secs);
    }

    pub fn inc_provider_failure(&self, provider: &str, kind: &str) {
        self.inner()
            .provider_failures
            .with_label_values(&[provider, kind])
            .inc();
    }

    pub fn inc_cache_hit(&self, provider: &str) {
        self.inner().cache_hits.with_label_values(&[provider]).inc();
    }

    pub fn inc_cache_miss(&self, provider: &str) {
        self.inner().cache_misses.with_label_values(&[provider]).inc();
    }

    pub fn inc_fallback_records(&self) {
        self.inner().fallback_records.inc();
    }

    pub fn set_region_intensity(&self, region: &str, datacenter_intensity: f64) {
        self.inner()
            .region_intensity
            .with_label_values(&[region])
            .set(datacenter_intensity);
    }

    /// Replace the per-source gauge with the latest tally
    pub fn set_source_tally(&self, tally: &BTreeMap<String, usize>) {
        let gauge = &self.inner().regions_by_source;
        gauge.reset();
        for (source, count) in tally {
            gauge.with_label_values(&[source.as_str()]).set(*count as i64);
        }
    }

    pub fn set_low_carbon_regions(&self, count: usize) {
        self.inner().low_carbon_regions.set(count as i64);
    }
}

/// Structured logger for advisor events
///
/// Emits named events with consistent fields so log pipelines can key off
/// `event` rather than message text.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, region_count: usize, reference_region: &str) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            regions = region_count,
            reference_region = %reference_region,
            "Carbon agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Carbon agent shutting down"
        );
    }

    pub fn log_refresh_completed(
        &self,
        regions: usize,
        fallbacks: usize,
        low_carbon: usize,
        elapsed_ms: u128,
    ) {
        if fallbacks > 0 {
            warn!(
                event = "refresh_completed",
                instance = %self.instance,
                regions = regions,
                fallbacks = fallbacks,
                low_carbon = low_carbon,
                elapsed_ms = elapsed_ms,
                "Refresh completed with fallback records"
            );
        } else {
            info!(
                event = "refresh_completed",
                instance = %self.instance,
                regions = regions,
                low_carbon = low_carbon,
                elapsed_ms = elapsed_ms,
                "Refresh completed"
            );
        }
    }

    pub fn log_refresh_skipped(&self) {
        info!(
            event = "refresh_skipped",
            instance = %self.instance,
            "Refresh already in flight, trigger skipped"
        );
    }

    pub fn log_region_fallback(&self, region: &str, attempts: usize) {
        warn!(
            event = "region_fallback",
            instance = %self.instance,
            region = %region,
            attempts = attempts,
            "Every provider failed, using fallback intensity"
        );
    }

    pub fn log_advisory(
        &self,
        region: &str,
        should_wait: bool,
        savings_percent: f64,
        wait_minutes: i64,
    ) {
        info!(
            event = "advisory_issued",
            instance = %self.instance,
            region = %region,
            should_wait = should_wait,
            savings_percent = savings_percent,
            wait_minutes = wait_minutes,
            "Time-shift advisory issued"
        );
    }
}
