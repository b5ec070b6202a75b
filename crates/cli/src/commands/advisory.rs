//! Time-shift advisory command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{format_intensity, format_timestamp, format_wait, print_json, print_warning, OutputFormat};
use carbon_lib::models::{AdvisoryOutcome, AdvisoryTarget};

/// Ask the agent whether to run now or wait
pub async fn advise(client: &ApiClient, region: Option<&str>, format: OutputFormat) -> Result<()> {
    let outcome = client.advisory(region).await?;

    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    let decision = match outcome {
        AdvisoryOutcome::NoForecastAvailable { region_code } => {
            print_warning(&format!(
                "No forecast available for {}; run whenever convenient",
                region_code
            ));
            return Ok(());
        }
        AdvisoryOutcome::Decision(decision) => decision,
    };

    println!("{}", "Time-Shift Advisory".bold());
    println!("{}", "=".repeat(50));
    println!("Current intensity:      {}", format_intensity(decision.current_intensity));

    if let AdvisoryTarget::Slot(slot) = &decision.target {
        println!(
            "Best slot:              {} ({})",
            format_timestamp(&slot.start_time),
            format_intensity(decision.target_intensity).green()
        );
    }
    println!();

    if decision.should_wait {
        println!(
            "{} {} for {:.1}% lower emissions",
            "Wait".yellow().bold(),
            format_wait(decision.wait_duration_minutes),
            decision.expected_savings_percent
        );
    } else {
        println!("{}", "Run now".green().bold());
        if decision.expected_savings_percent > 0.0 {
            println!(
                "{}",
                format!(
                    "Waiting {} would save only {:.1}%",
                    format_wait(decision.wait_duration_minutes),
                    decision.expected_savings_percent
                )
                .dimmed()
            );
        }
    }
    Ok(())
}
