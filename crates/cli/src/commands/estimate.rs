//! Workload footprint estimate command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{format_grams, format_intensity, print_json, OutputFormat};
use carbon_lib::accounting::{estimate, WorkloadSpec};
use carbon_lib::models::WorkloadEstimate;
use carbon_lib::responses::EstimateResponse;

/// Workload parameters collected from the command line
#[derive(Debug, Clone)]
pub struct EstimateRequest {
    pub vcpus: f64,
    pub memory_gb: f64,
    pub minutes: f64,
    pub provider: Option<String>,
}

impl EstimateRequest {
    fn workload(&self) -> WorkloadSpec {
        WorkloadSpec {
            vcpu_count: self.vcpus,
            memory_gb: self.memory_gb,
            duration_minutes: self.minutes,
            provider: self.provider.clone(),
        }
    }

    fn query(&self, region: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("vcpus", self.vcpus.to_string()),
            ("memory_gb", self.memory_gb.to_string()),
            ("duration_minutes", self.minutes.to_string()),
        ];
        if let Some(provider) = &self.provider {
            query.push(("provider", provider.clone()));
        }
        if let Some(region) = region {
            query.push(("region", region.to_string()));
        }
        query
    }
}

/// Estimate against a known intensity without contacting the agent
pub fn estimate_local(request: &EstimateRequest, intensity: f64, format: OutputFormat) -> Result<()> {
    let workload = request.workload();
    let result = estimate(&workload, intensity);

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    print_estimate(None, intensity, &result);
    Ok(())
}

/// Estimate using a region's current intensity from the agent
pub async fn estimate_for_region(
    client: &ApiClient,
    request: &EstimateRequest,
    region: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let result: EstimateResponse = client.estimate(&request.query(region)).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    print_estimate(Some(&result.region_code), result.intensity, &result.estimate);
    Ok(())
}

fn print_estimate(region: Option<&str>, intensity: f64, result: &WorkloadEstimate) {
    println!("{}", "Workload Carbon Estimate".bold());
    println!("{}", "=".repeat(50));
    if let Some(region) = region {
        println!("Region:                 {}", region.cyan());
    }
    println!("Intensity:              {}", format_intensity(intensity));
    println!("Energy:                 {:.4} kWh", result.energy_kwh);
    println!();
    println!("Operational:            {}", format_grams(result.operational_grams_co2));
    println!("Embodied:               {}", format_grams(result.embodied_grams_co2));
    println!(
        "{}  {}",
        "Total (SCI):".bold(),
        format_grams(result.total_grams_co2).green().bold()
    );
}
