//! Carbon Region Advisor CLI
//!
//! A command-line tool for querying the carbon agent: region intensities,
//! the cross-region summary, the reference forecast, run-now-or-defer advice
//! and workload footprint estimates.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{advisory, estimate, regions};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Carbon Region Advisor CLI
#[derive(Parser)]
#[command(name = "carbon")]
#[command(author, version, about = "CLI for the Carbon Region Advisor", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via CARBON_API_URL env var)
    #[arg(long, env = "CARBON_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every monitored region with its current intensity
    Regions,

    /// Show the cross-region summary
    Summary,

    /// Show the reference region's forecast
    Forecast,

    /// Advise whether to run now or wait for a cleaner slot
    Advise {
        /// Region to advise on (defaults to the reference region)
        #[arg(long, short)]
        region: Option<String>,
    },

    /// Estimate a workload's carbon footprint
    Estimate {
        /// Number of vCPUs
        #[arg(long)]
        vcpus: f64,

        /// Memory in GB
        #[arg(long)]
        memory_gb: f64,

        /// Run time in minutes
        #[arg(long)]
        minutes: f64,

        /// Cloud provider (aws, gcp, azure)
        #[arg(long)]
        provider: Option<String>,

        /// Datacenter intensity in gCO2/kWh; computed locally
        #[arg(long, conflicts_with = "region")]
        intensity: Option<f64>,

        /// Use this region's current intensity from the agent
        /// (defaults to the reference region)
        #[arg(long, short)]
        region: Option<String>,
    },

    /// Trigger a refresh cycle on the agent
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli.format.or(config.format()).unwrap_or_default();

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Regions => regions::list_regions(&client, format).await?,
        Commands::Summary => regions::show_summary(&client, format).await?,
        Commands::Forecast => regions::show_forecast(&client, format).await?,
        Commands::Advise { region } => {
            let region = region.or(config.default_region);
            advisory::advise(&client, region.as_deref(), format).await?;
        }
        Commands::Estimate {
            vcpus,
            memory_gb,
            minutes,
            provider,
            intensity,
            region,
        } => {
            let request = estimate::EstimateRequest {
                vcpus,
                memory_gb,
                minutes,
                provider,
            };
            match intensity {
                Some(intensity) => estimate::estimate_local(&request, intensity, format)?,
                None => {
                    let region = region.or(config.default_region);
                    estimate::estimate_for_region(&client, &request, region.as_deref(), format)
                        .await?
                }
            }
        }
        Commands::Refresh => regions::trigger_refresh(&client, format).await?,
    }

    Ok(())
}
