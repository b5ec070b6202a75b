//! Carbon-intensity resolution and time-shift advisory engine
//!
//! This crate provides the core functionality for:
//! - Resolving per-region carbon intensity through a provider cascade
//! - Converting grid intensity to datacenter-adjusted intensity
//! - Cross-region aggregation and classification
//! - Run-now-or-defer advice over the reference forecast
//! - Workload carbon accounting
//! - Health checks and observability

pub mod accounting;
pub mod advisor;
pub mod aggregate;
pub mod cache;
pub mod convert;
pub mod health;
pub mod models;
pub mod observability;
pub mod providers;
pub mod refresh;
pub mod regions;
pub mod resolver;
pub mod responses;

#[cfg(test)]
mod testing;

pub use advisor::{AdvisorThresholds, TimeShiftAdvisor};
pub use aggregate::{classify, summarize, Recommendation, RegionSummary};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{CarbonMetrics, StructuredLogger};
pub use refresh::{RefreshOutcome, Refresher, RegionTable, RegionTableSnapshot};
pub use resolver::SourceResolver;
