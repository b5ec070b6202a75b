//! Software Carbon Intensity estimate for a hypothetical workload

use crate::models::WorkloadEstimate;
use serde::{Deserialize, Serialize};

/// Thermal design power attributed to one vCPU, watts
pub const VCPU_TDP_WATTS: f64 = 10.0;

/// Memory energy coefficient, kWh per GB per hour
pub const MEMORY_COEFF_PER_HOUR: f64 = 0.000392;

/// Embodied emissions per vCPU-hour, grams CO2
pub const EMBODIED_GRAMS_PER_VCPU_HOUR: f64 = 2.5;

const DEFAULT_PROVIDER_PUE: f64 = 1.135;

/// Facility overhead for a cloud provider name (`aws`, `gcp`, `azure`)
pub fn provider_pue(provider: Option<&str>) -> f64 {
    match provider.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
        Some("gcp") => 1.1,
        Some("azure") => 1.185,
        _ => DEFAULT_PROVIDER_PUE,
    }
}

/// Shape of the workload being estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub vcpu_count: f64,
    pub memory_gb: f64,
    pub duration_minutes: f64,
    /// Defaults to `aws` when absent
    #[serde(default)]
    pub provider: Option<String>,
}

/// Estimate the footprint of `workload` running at `intensity` gCO2/kWh
///
/// Negative or non-finite inputs are treated as zero.
pub fn estimate(workload: &WorkloadSpec, intensity: f64) -> WorkloadEstimate {
    let vcpus = non_negative(workload.vcpu_count);
    let memory_gb = non_negative(workload.memory_gb);
    let hours = non_negative(workload.duration_minutes) / 60.0;
    let intensity = non_negative(intensity);

    let power_watts = vcpus * VCPU_TDP_WATTS + memory_gb * MEMORY_COEFF_PER_HOUR * 1000.0;
    let energy_kwh = (power_watts * hours / 1000.0) * provider_pue(workload.provider.as_deref());

    let operational_grams_co2 = energy_kwh * intensity;
    let embodied_grams_co2 = vcpus * hours * EMBODIED_GRAMS_PER_VCPU_HOUR;

    WorkloadEstimate {
        energy_kwh,
        operational_grams_co2,
        embodied_grams_co2,
        total_grams_co2: operational_grams_co2 + embodied_grams_co2,
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
