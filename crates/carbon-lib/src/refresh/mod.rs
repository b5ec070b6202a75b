//! Refresh cycle over every configured region
//!
//! One cycle fans the per-region resolutions out as tokio tasks, fans them
//! back in, merges the reference side data and swaps the result into the
//! shared [`RegionTable`]. A region whose task fails or panics still gets the
//! hard-fallback record, so the table is always total.

mod r#loop;
mod table;

pub use r#loop::{RefreshConfig, RefreshLoop};
pub use table::{RegionTable, RegionTableSnapshot};

use crate::health::{components, HealthRegistry};
use crate::models::RegionMetadata;
use crate::observability::{CarbonMetrics, StructuredLogger};
use crate::resolver::{Resolution, SourceResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Result of one completed refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub regions: usize,
    pub fallbacks: usize,
    pub low_carbon_count: usize,
    pub source_tally: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
    pub refreshed_at: DateTime<Utc>,
}

/// What happened to a refresh trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed(RefreshReport),
    /// Another cycle was already in flight
    Skipped,
}

/// Clears the in-flight flag when the cycle ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs single-flight refresh cycles
pub struct Refresher {
    resolver: Arc<SourceResolver>,
    regions: Arc<Vec<RegionMetadata>>,
    table: RegionTable,
    health: HealthRegistry,
    metrics: CarbonMetrics,
    logger: StructuredLogger,
    in_flight: AtomicBool,
}

impl Refresher {
    pub fn new(
        resolver: Arc<SourceResolver>,
        regions: Vec<RegionMetadata>,
        table: RegionTable,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            resolver,
            regions: Arc::new(regions),
            table,
            health,
            metrics: CarbonMetrics::new(),
            logger,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    pub fn regions(&self) -> &[RegionMetadata] {
        &self.regions
    }

    pub fn table(&self) -> &RegionTable {
        &self.table
    }

    /// Register the refresh and live-provider health components
    pub async fn register_health(&self) {
        self.health.register(components::REFRESH).await;
        for provider in components::PROVIDERS {
            self.health.register(provider).await;
        }
    }

    /// Run one cycle unless another is already running
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.metrics.inc_refreshes_skipped();
            self.logger.log_refresh_skipped();
            return RefreshOutcome::Skipped;
        };

        let start = Instant::now();
        let resolutions = self.resolve_all().await;
        let refreshed_at = Utc::now();

        let fallbacks = resolutions.iter().filter(|r| r.is_fallback()).count();
        for resolution in resolutions.iter().filter(|r| r.is_fallback()) {
            self.logger
                .log_region_fallback(&resolution.record.region_code, resolution.failures.len());
        }
        self.update_health(&resolutions, fallbacks).await;

        let snapshot = RegionTableSnapshot::from_resolutions(resolutions, refreshed_at);
        let summary = snapshot.summary();
        let source_tally = snapshot.source_tally.clone();

        for record in &snapshot.records {
            self.metrics
                .set_region_intensity(&record.region_code, record.datacenter_intensity);
        }
        self.metrics.set_source_tally(&source_tally);
        self.metrics.set_low_carbon_regions(summary.low_carbon_count);

        let regions = snapshot.records.len();
        self.table.replace(snapshot).await;
        self.health.mark_refreshed(refreshed_at).await;

        let elapsed = start.elapsed();
        self.metrics.observe_refresh_latency(elapsed.as_secs_f64());
        self.logger.log_refresh_completed(
            regions,
            fallbacks,
            summary.low_carbon_count,
            elapsed.as_millis(),
        );

        RefreshOutcome::Completed(RefreshReport {
            regions,
            fallbacks,
            low_carbon_count: summary.low_carbon_count,
            source_tally,
            elapsed_ms: elapsed.as_millis() as u64,
            refreshed_at,
        })
    }

    /// Resolve every region concurrently, preserving configured order
    async fn resolve_all(&self) -> Vec<Resolution> {
        let handles: Vec<_> = self
            .regions
            .iter()
            .map(|region| {
                let resolver = self.resolver.clone();
                let region = region.clone();
                tokio::spawn(async move { resolver.resolve(&region).await })
            })
            .collect();

        let mut resolutions = Vec::with_capacity(handles.len());
        for (region, handle) in self.regions.iter().zip(handles) {
            match handle.await {
                Ok(resolution) => resolutions.push(resolution),
                Err(e) => {
                    warn!(
                        region = %region.region_code,
                        error = %e,
                        "Resolution task failed, using fallback record"
                    );
                    resolutions.push(self.resolver.fallback_resolution(region));
                }
            }
        }
        resolutions
    }

    async fn update_health(&self, resolutions: &[Resolution], fallbacks: usize) {
        for provider in components::PROVIDERS {
            let failures = resolutions
                .iter()
                .flat_map(|r| r.failures.iter())
                .filter(|f| f.provider == provider)
                .count();
            let answered = resolutions
                .iter()
                .filter(|r| r.answered_by == Some(provider))
                .count();
            self.health
                .record_provider_outcome(provider, failures + answered, failures)
                .await;
        }

        // An upstream outage still serves fallback records: Degraded at worst
        if fallbacks == 0 {
            self.health.set_healthy(components::REFRESH).await;
        } else if fallbacks == resolutions.len() {
            self.health
                .set_degraded(components::REFRESH, "every region fell back")
                .await;
        } else {
            self.health
                .set_degraded(
                    components::REFRESH,
                    format!("{} of {} regions fell back", fallbacks, resolutions.len()),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ComponentStatus;
    use crate::models::IntensityBand;
    use crate::providers::{labels, names, ProviderReading};
    use crate::regions::default_regions;
    use crate::testing::{region, scripted_set, ScriptedProvider};

    fn refresher(
        grid: ScriptedProvider,
        global: ScriptedProvider,
        regions: Vec<RegionMetadata>,
    ) -> Refresher {
        let providers = scripted_set(Arc::new(grid), Arc::new(global));
        Refresher::new(
            Arc::new(SourceResolver::new(providers, "eu-west-2")),
            regions,
            RegionTable::new(),
            HealthRegistry::new(),
            StructuredLogger::new("test"),
        )
    }

    fn global(value: f64, realtime: bool) -> ProviderReading {
        ProviderReading::grid(labels::GLOBAL_PROVIDER, value, realtime)
    }

    #[tokio::test]
    async fn test_end_to_end_cycle_with_one_fallback() {
        let grid = ScriptedProvider::new(names::GRID_AUTHORITY).answering(
            "eu-west-2",
            ProviderReading::grid(labels::GRID_AUTHORITY, 238.0, true),
        );
        let global = ScriptedProvider::new(names::GLOBAL_PROVIDER)
            .answering("us-east-1", global(380.0, true))
            .answering("us-west-2", global(200.0, true))
            .answering("eu-west-1", global(300.0, false))
            .answering("eu-central-1", global(400.0, true))
            .answering("eu-north-1", global(40.0, false))
            .answering("ap-northeast-1", global(485.0, true));

        let refresher = refresher(grid, global, default_regions());
        refresher.register_health().await;

        let RefreshOutcome::Completed(report) = refresher.refresh_once().await else {
            panic!("refresh was skipped");
        };

        assert_eq!(report.regions, 8);
        assert_eq!(report.fallbacks, 1);
        // eu-west-2 54.0, us-west-2 22.7, eu-west-1 51.1, eu-north-1 2.3
        assert_eq!(report.low_carbon_count, 4);
        assert_eq!(report.source_tally[labels::GLOBAL_PROVIDER], 6);
        assert_eq!(report.source_tally[labels::GRID_AUTHORITY], 1);
        assert_eq!(report.source_tally[labels::FALLBACK], 1);

        let snapshot = refresher.table().snapshot().await;
        let sydney = snapshot.record("ap-southeast-2").unwrap();
        assert_eq!(sydney.datacenter_intensity, 300.0);
        assert_eq!(sydney.classification, IntensityBand::Moderate);

        let summary = snapshot.summary();
        assert_eq!(summary.region_count, 8);
        assert_eq!(summary.realtime_count, 5);
        assert_eq!(summary.stats.unwrap().lowest.region_code, "eu-north-1");

        let health = refresher.health.health().await;
        assert_eq!(health.components[components::REFRESH].status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::GLOBAL_PROVIDER].status,
            ComponentStatus::Healthy
        );
        assert_eq!(
            health.components[components::CLIMATE_DATA].status,
            ComponentStatus::Degraded
        );
        assert!(refresher.health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_every_region_falling_back_is_degraded_but_ready() {
        let refresher = refresher(
            ScriptedProvider::new(names::GRID_AUTHORITY),
            ScriptedProvider::new(names::GLOBAL_PROVIDER),
            vec![region("eu-west-2", "GBR", None), region("us-east-1", "USA", None)],
        );
        refresher.register_health().await;

        let RefreshOutcome::Completed(report) = refresher.refresh_once().await else {
            panic!("refresh was skipped");
        };

        assert_eq!(report.fallbacks, 2);
        let health = refresher.health.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::REFRESH].message.as_deref(),
            Some("every region fell back")
        );
        assert!(refresher.health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_panicked_task_gets_fallback_record() {
        let global = ScriptedProvider::new(names::GLOBAL_PROVIDER)
            .answering("us-west-2", global(200.0, true))
            .panicking_for("eu-west-1");
        let refresher = refresher(
            ScriptedProvider::new(names::GRID_AUTHORITY),
            global,
            vec![region("us-west-2", "USA", Some(0.9)), region("eu-west-1", "IRL", Some(0.85))],
        );

        let RefreshOutcome::Completed(report) = refresher.refresh_once().await else {
            panic!("refresh was skipped");
        };

        assert_eq!(report.fallbacks, 1);
        let snapshot = refresher.table().snapshot().await;
        assert_eq!(snapshot.records[0].source, labels::GLOBAL_PROVIDER);
        assert_eq!(snapshot.records[1].source, labels::FALLBACK);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let refresher = refresher(
            ScriptedProvider::new(names::GRID_AUTHORITY),
            ScriptedProvider::new(names::GLOBAL_PROVIDER),
            vec![region("us-east-1", "USA", None)],
        );

        let held = InFlightGuard::acquire(&refresher.in_flight).unwrap();
        assert_eq!(refresher.refresh_once().await, RefreshOutcome::Skipped);
        assert!(!refresher.table().snapshot().await.is_populated());

        drop(held);
        assert!(matches!(
            refresher.refresh_once().await,
            RefreshOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_forecast_replaced_each_cycle() {
        let reading = ProviderReading {
            reference: Some(crate::providers::ReferenceData {
                forecast: vec![crate::models::ForecastSlot {
                    start_time: Utc::now(),
                    end_time: Utc::now() + chrono::Duration::minutes(30),
                    grid_intensity: 100.0,
                    datacenter_intensity: None,
                    index: None,
                }],
                fuel_mix: None,
            }),
            ..ProviderReading::grid(labels::GRID_AUTHORITY, 238.0, true)
        };
        let grid = Arc::new(
            ScriptedProvider::new(names::GRID_AUTHORITY).answering("eu-west-2", reading),
        );
        let providers = scripted_set(grid, Arc::new(ScriptedProvider::new(names::GLOBAL_PROVIDER)));
        let refresher = Refresher::new(
            Arc::new(SourceResolver::new(providers, "eu-west-2")),
            vec![region("eu-west-2", "GBR", None)],
            RegionTable::new(),
            HealthRegistry::new(),
            StructuredLogger::new("test"),
        );

        refresher.refresh_once().await;
        let snapshot = refresher.table().snapshot().await;
        assert_eq!(snapshot.forecast.len(), 1);
        assert_eq!(snapshot.forecast[0].datacenter_intensity, Some(22.7));
    }
}
