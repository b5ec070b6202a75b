//! HTTP API for health checks, Prometheus metrics and the advisor outputs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use carbon_lib::{
    accounting::{estimate, WorkloadSpec},
    advisor::TimeShiftAdvisor,
    health::{ComponentStatus, HealthRegistry},
    models::{AdvisoryOutcome, ForecastSlot, RegionIntensityRecord},
    observability::StructuredLogger,
    refresh::{RefreshOutcome, Refresher, RegionTableSnapshot},
    responses::{EstimateResponse, ErrorResponse, ForecastResponse, RegionsResponse, SummaryResponse},
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub refresher: Arc<Refresher>,
    pub advisor: TimeShiftAdvisor,
    pub health_registry: HealthRegistry,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        refresher: Arc<Refresher>,
        advisor: TimeShiftAdvisor,
        health_registry: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            refresher,
            advisor,
            health_registry,
            logger,
        }
    }

    async fn snapshot(&self) -> Arc<RegionTableSnapshot> {
        self.refresher.table().snapshot().await
    }

    fn reference_region(&self) -> &str {
        self.refresher.resolver().reference_region()
    }
}

/// Errors surfaced as JSON bodies
#[derive(Debug)]
pub enum ApiError {
    UnknownRegion(String),
    NotRefreshed,
    NotFound(&'static str),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnknownRegion(region) => {
                (StatusCode::NOT_FOUND, format!("unknown region: {}", region))
            }
            ApiError::NotRefreshed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no refresh cycle completed yet".to_string(),
            ),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} unavailable", what)),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the first refresh completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::Internal("failed to encode metrics".to_string())
    })?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    ))
}

async fn regions(State(state): State<Arc<AppState>>) -> Json<RegionsResponse> {
    let snapshot = state.snapshot().await;
    Json(RegionsResponse {
        refreshed_at: snapshot.refreshed_at,
        regions: snapshot.records.clone(),
    })
}

async fn summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let snapshot = state.snapshot().await;
    Json(SummaryResponse {
        refreshed_at: snapshot.refreshed_at,
        summary: snapshot.summary(),
        source_tally: snapshot.source_tally.clone(),
    })
}

async fn forecast(State(state): State<Arc<AppState>>) -> Json<ForecastResponse> {
    let snapshot = state.snapshot().await;
    Json(ForecastResponse {
        region_code: state.reference_region().to_string(),
        refreshed_at: snapshot.refreshed_at,
        slots: snapshot.forecast.clone(),
    })
}

async fn fuel_mix(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.snapshot().await;
    snapshot
        .fuel_mix
        .clone()
        .map(Json)
        .ok_or(ApiError::NotFound("fuel mix"))
}

#[derive(Debug, Deserialize)]
struct RegionQuery {
    region: Option<String>,
}

/// Look a region up in a populated snapshot
fn lookup<'a>(
    snapshot: &'a RegionTableSnapshot,
    region: &str,
) -> Result<&'a RegionIntensityRecord, ApiError> {
    if !snapshot.is_populated() {
        return Err(ApiError::NotRefreshed);
    }
    snapshot
        .record(region)
        .ok_or_else(|| ApiError::UnknownRegion(region.to_string()))
}

async fn advisory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<AdvisoryOutcome>, ApiError> {
    let region = query
        .region
        .unwrap_or_else(|| state.reference_region().to_string());
    let snapshot = state.snapshot().await;
    let record = lookup(&snapshot, &region)?;

    // only the reference region has a forecast
    let forecast: &[ForecastSlot] = if region == state.reference_region() {
        snapshot.forecast.as_slice()
    } else {
        &[]
    };

    let outcome = state.advisor.advise(
        &region,
        forecast,
        record.datacenter_intensity,
        record.renewable_fraction,
        Utc::now(),
    );
    if let AdvisoryOutcome::Decision(decision) = &outcome {
        state.logger.log_advisory(
            &region,
            decision.should_wait,
            decision.expected_savings_percent,
            decision.wait_duration_minutes,
        );
    }

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct EstimateQuery {
    vcpus: f64,
    memory_gb: f64,
    duration_minutes: f64,
    provider: Option<String>,
    region: Option<String>,
}

async fn workload_estimate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let region = query
        .region
        .unwrap_or_else(|| state.reference_region().to_string());
    let snapshot = state.snapshot().await;
    let intensity = lookup(&snapshot, &region)?.datacenter_intensity;

    let workload = WorkloadSpec {
        vcpu_count: query.vcpus,
        memory_gb: query.memory_gb,
        duration_minutes: query.duration_minutes,
        provider: query.provider,
    };
    let estimate = estimate(&workload, intensity);

    Ok(Json(EstimateResponse {
        region_code: region,
        intensity,
        workload,
        estimate,
    }))
}

async fn trigger_refresh(State(state): State<Arc<AppState>>) -> Json<RefreshOutcome> {
    Json(state.refresher.refresh_once().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/regions", get(regions))
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/forecast", get(forecast))
        .route("/api/v1/fuel-mix", get(fuel_mix))
        .route("/api/v1/advisory", get(advisory))
        .route("/api/v1/estimate", get(workload_estimate))
        .route("/api/v1/refresh", post(trigger_refresh))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
