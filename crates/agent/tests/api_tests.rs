//! Integration tests for the agent API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use carbon_agent::api::{create_router, AppState};
use carbon_lib::{
    advisor::TimeShiftAdvisor,
    health::HealthRegistry,
    models::{ForecastSlot, FuelMix, FuelShare, RegionMetadata},
    observability::StructuredLogger,
    providers::{
        labels, names, CountryTableProvider, GlobalRegionsProvider, IntensityProvider,
        ProviderError, ProviderReading, ProviderSet, ReferenceData,
    },
    refresh::{Refresher, RegionTable},
    resolver::SourceResolver,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower::ServiceExt;

/// Grid authority stand-in answering only for the reference region
struct StubGridAuthority;

#[async_trait]
impl IntensityProvider for StubGridAuthority {
    fn name(&self) -> &'static str {
        names::GRID_AUTHORITY
    }

    async fn fetch(&self, region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        if region.region_code != "eu-west-2" {
            return Err(ProviderError::NoData(region.region_code.clone()));
        }
        let now = Utc::now();
        let forecast = [238.0, 100.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, grid)| ForecastSlot {
                start_time: now + Duration::minutes(30 * (i as i64 + 1)),
                end_time: now + Duration::minutes(30 * (i as i64 + 2)),
                grid_intensity: *grid,
                datacenter_intensity: None,
                index: Some("moderate".to_string()),
            })
            .collect();

        Ok(ProviderReading {
            reference: Some(ReferenceData {
                forecast,
                fuel_mix: Some(FuelMix {
                    from: None,
                    to: None,
                    shares: vec![
                        FuelShare {
                            fuel: "wind".to_string(),
                            percent: 41.2,
                        },
                        FuelShare {
                            fuel: "gas".to_string(),
                            percent: 22.5,
                        },
                    ],
                }),
            }),
            ..ProviderReading::grid(labels::GRID_AUTHORITY, 238.0, true)
        })
    }
}

/// Live provider that is never reachable in tests
struct Unreachable(&'static str);

#[async_trait]
impl IntensityProvider for Unreachable {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn fetch(&self, _region: &RegionMetadata) -> Result<ProviderReading, ProviderError> {
        Err(ProviderError::NotConfigured("test"))
    }
}

fn region(code: &str, country: &str, renewable_fraction: Option<f64>) -> RegionMetadata {
    RegionMetadata {
        region_code: code.to_string(),
        location: code.to_string(),
        country_code: country.to_string(),
        latitude: 0.0,
        longitude: 0.0,
        renewable_fraction,
    }
}

async fn setup_test_app() -> Arc<AppState> {
    let providers = ProviderSet {
        grid_authority: Arc::new(StubGridAuthority),
        global: Arc::new(Unreachable(names::GLOBAL_PROVIDER)),
        global_regions: Arc::new(GlobalRegionsProvider::new()),
        climate_data: Arc::new(Unreachable(names::CLIMATE_DATA)),
        country_table: Arc::new(CountryTableProvider::new(0.0)),
    };
    let regions = vec![
        region("eu-west-2", "GBR", None),
        region("eu-north-1", "SWE", Some(0.95)),
        region("us-east-1", "USA", Some(0.65)),
    ];
    build_app(providers, regions).await
}

/// Every source down, including the embedded tables
async fn setup_outage_app() -> Arc<AppState> {
    let providers = ProviderSet {
        grid_authority: Arc::new(Unreachable(names::GRID_AUTHORITY)),
        global: Arc::new(Unreachable(names::GLOBAL_PROVIDER)),
        global_regions: Arc::new(Unreachable(names::GLOBAL_REGIONS)),
        climate_data: Arc::new(Unreachable(names::CLIMATE_DATA)),
        country_table: Arc::new(Unreachable(names::COUNTRY_TABLE)),
    };
    build_app(providers, vec![region("eu-west-2", "GBR", None)]).await
}

async fn build_app(providers: ProviderSet, regions: Vec<RegionMetadata>) -> Arc<AppState> {
    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new("api-test");
    let refresher = Arc::new(Refresher::new(
        Arc::new(SourceResolver::new(providers, "eu-west-2")),
        regions,
        RegionTable::new(),
        health_registry.clone(),
        logger.clone(),
    ));
    refresher.register_health().await;

    Arc::new(AppState::new(
        refresher,
        TimeShiftAdvisor::default(),
        health_registry,
        logger,
    ))
}

async fn setup_refreshed_app() -> Arc<AppState> {
    let state = setup_test_app().await;
    state.refresher.refresh_once().await;
    state
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(state, "GET", uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let state = setup_test_app().await;

    let (status, health) = get_json(&state, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["refresh"].is_object());
    assert!(health["components"]["grid_authority"].is_object());
}

#[tokio::test]
async fn test_healthz_degraded_after_provider_failures() {
    let state = setup_refreshed_app().await;

    let (status, health) = get_json(&state, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["global_provider"]["status"], "degraded");
    assert_eq!(health["components"]["grid_authority"]["status"], "healthy");
    assert_eq!(health["components"]["refresh"]["status"], "healthy");
}

#[tokio::test]
async fn test_provider_outage_keeps_agent_healthy_and_ready() {
    let state = setup_outage_app().await;
    state.refresher.refresh_once().await;

    let (status, regions) = get_json(&state, "/api/v1/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(regions["regions"][0]["source"], labels::FALLBACK);

    let (status, health) = get_json(&state, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["refresh"]["status"], "degraded");

    let (status, readiness) = get_json(&state, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let state = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy("refresh", "region table unavailable")
        .await;

    let (status, health) = get_json(&state, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_tracks_first_refresh() {
    let state = setup_test_app().await;

    let (status, readiness) = get_json(&state, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.refresher.refresh_once().await;

    let (status, readiness) = get_json(&state, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_regions_in_configured_order() {
    let state = setup_test_app().await;

    let (status, body) = get_json(&state, "/api/v1/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["refreshed_at"].is_null());
    assert_eq!(body["regions"].as_array().unwrap().len(), 0);

    state.refresher.refresh_once().await;

    let (_, body) = get_json(&state, "/api/v1/regions").await;
    let regions = body["regions"].as_array().unwrap();
    let codes: Vec<_> = regions.iter().map(|r| r["region_code"].as_str().unwrap()).collect();
    assert_eq!(codes, vec!["eu-west-2", "eu-north-1", "us-east-1"]);

    assert_eq!(regions[0]["source"], labels::GRID_AUTHORITY);
    assert_eq!(regions[0]["datacenter_intensity"], 54.0);
    assert_eq!(regions[0]["classification"], "LOW");
    // 41 * 0.05 * 1.135
    assert_eq!(regions[1]["datacenter_intensity"], 2.3);
    assert_eq!(regions[1]["source"], labels::COUNTRY_TABLE);
    assert_eq!(regions[2]["is_realtime"], false);
}

#[tokio::test]
async fn test_summary() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(&state, "/api/v1/summary").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["region_count"], 3);
    assert_eq!(body["summary"]["low_carbon_count"], 2);
    assert_eq!(body["summary"]["realtime_count"], 1);
    assert_eq!(body["summary"]["stats"]["lowest"]["region_code"], "eu-north-1");
    assert_eq!(body["summary"]["stats"]["highest"]["region_code"], "us-east-1");
    assert_eq!(body["summary"]["stats"]["recommendation"], "run_now");
    assert_eq!(body["source_tally"][labels::COUNTRY_TABLE], 2);
}

#[tokio::test]
async fn test_forecast_is_datacenter_adjusted() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(&state, "/api/v1/forecast").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["region_code"], "eu-west-2");
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["datacenter_intensity"], 54.0);
    assert_eq!(slots[1]["datacenter_intensity"], 22.7);
    assert_eq!(slots[2]["datacenter_intensity"], 68.1);
}

#[tokio::test]
async fn test_fuel_mix_404_until_available() {
    let state = setup_test_app().await;

    let (status, body) = get_json(&state, "/api/v1/fuel-mix").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    state.refresher.refresh_once().await;

    let (status, body) = get_json(&state, "/api/v1/fuel-mix").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shares"][0]["fuel"], "wind");
}

#[tokio::test]
async fn test_advisory_for_reference_region_waits() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(&state, "/api/v1/advisory").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "decision");
    assert_eq!(body["should_wait"], true);
    assert_eq!(body["current_intensity"], 54.0);
    assert_eq!(body["target_intensity"], 22.7);
    assert_eq!(body["target"]["kind"], "slot");
    let wait = body["wait_duration_minutes"].as_i64().unwrap();
    assert!((58..=60).contains(&wait), "wait {}", wait);
}

#[tokio::test]
async fn test_advisory_without_forecast() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(&state, "/api/v1/advisory?region=eu-north-1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_forecast_available");
    assert_eq!(body["region_code"], "eu-north-1");
}

#[tokio::test]
async fn test_advisory_unknown_region_returns_404() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(&state, "/api/v1/advisory?region=mars-north-1").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown region: mars-north-1");
}

#[tokio::test]
async fn test_advisory_before_refresh_returns_503() {
    let state = setup_test_app().await;

    let (status, body) = get_json(&state, "/api/v1/advisory").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_estimate_uses_region_intensity() {
    let state = setup_refreshed_app().await;

    let (status, body) = get_json(
        &state,
        "/api/v1/estimate?vcpus=2&memory_gb=4&duration_minutes=60&region=eu-north-1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["region_code"], "eu-north-1");
    assert_eq!(body["intensity"], 2.3);
    let total = body["estimate"]["total_grams_co2"].as_f64().unwrap();
    // 0.02447968 kWh * 2.3 + 5.0 embodied
    assert!((total - 5.056303264).abs() < 1e-9, "total {}", total);
}

#[tokio::test]
async fn test_estimate_requires_workload_parameters() {
    let state = setup_refreshed_app().await;

    let (status, _) = send(&state, "GET", "/api/v1/estimate?vcpus=2").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_refresh_reports_completion() {
    let state = setup_test_app().await;

    let (status, body) = send(&state, "POST", "/api/v1/refresh").await;
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["regions"], 3);
    assert_eq!(body["fallbacks"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let state = setup_refreshed_app().await;

    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("carbon_refresh_latency_seconds_bucket"));
    assert!(metrics_text.contains("carbon_region_datacenter_intensity"));
    assert!(metrics_text.contains("carbon_provider_failures_total"));
}
