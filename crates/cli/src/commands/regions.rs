//! Region table, summary, forecast and refresh commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_band, format_intensity, format_timestamp, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};
use carbon_lib::refresh::RefreshOutcome;

/// Row for the regions table
#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Grid")]
    grid: String,
    #[tabled(rename = "Datacenter")]
    datacenter: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Live")]
    live: String,
}

/// Row for the forecast table
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Grid")]
    grid: String,
    #[tabled(rename = "Datacenter")]
    datacenter: String,
    #[tabled(rename = "Index")]
    index: String,
}

/// List every region
pub async fn list_regions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.regions().await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    let Some(refreshed_at) = result.refreshed_at else {
        print_warning("Agent has not completed a refresh yet");
        return Ok(());
    };

    let rows: Vec<RegionRow> = result
        .regions
        .iter()
        .map(|r| RegionRow {
            region: r.region_code.clone(),
            location: r.location.clone(),
            grid: format!("{:.0}", r.grid_intensity),
            datacenter: format!("{:.1}", r.datacenter_intensity),
            band: color_band(r.classification),
            source: r.source.clone(),
            live: if r.is_realtime { "yes".green().to_string() } else { "no".dimmed().to_string() },
        })
        .collect();

    print_table(&rows);
    println!(
        "Intensities in gCO2/kWh. Refreshed {}",
        format_timestamp(&refreshed_at).dimmed()
    );
    Ok(())
}

/// Show the cross-region summary
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.summary().await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    let summary = &result.summary;
    println!("{}", "Region Summary".bold());
    println!("{}", "=".repeat(50));

    let Some(stats) = &summary.stats else {
        print_warning("No region data available yet");
        return Ok(());
    };

    println!("Regions:                {}", summary.region_count);
    println!("Low-carbon regions:     {}", summary.low_carbon_count.to_string().green());
    println!("Live signals:           {}", summary.realtime_count);
    println!();
    println!(
        "Cleanest:               {} ({})",
        stats.lowest.region_code.cyan(),
        format_intensity(stats.lowest.datacenter_intensity).green()
    );
    println!(
        "Dirtiest:               {} ({})",
        stats.highest.region_code.cyan(),
        format_intensity(stats.highest.datacenter_intensity).red()
    );
    println!(
        "Mean:                   {} [{}]",
        format_intensity(stats.mean_intensity),
        color_band(stats.mean_classification)
    );
    println!();
    println!("{} {}", "Recommendation:".bold(), stats.recommendation.label().bold());

    if !result.source_tally.is_empty() {
        println!();
        println!("{}", "Sources".bold());
        println!("{}", "-".repeat(50));
        for (source, count) in &result.source_tally {
            println!("  {:<44} {}", source, count);
        }
    }

    if let Some(refreshed_at) = result.refreshed_at {
        println!();
        println!("Last refresh: {}", format_timestamp(&refreshed_at).dimmed());
    }
    Ok(())
}

/// Show the reference region's forecast
pub async fn show_forecast(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.forecast().await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    if result.slots.is_empty() {
        print_warning(&format!("No forecast available for {}", result.region_code));
        return Ok(());
    }

    println!("{} {}", "Forecast for".bold(), result.region_code.cyan().bold());
    let rows: Vec<ForecastRow> = result
        .slots
        .iter()
        .map(|slot| ForecastRow {
            from: slot.start_time.format("%a %H:%M").to_string(),
            to: slot.end_time.format("%H:%M").to_string(),
            grid: format!("{:.0}", slot.grid_intensity),
            datacenter: slot
                .datacenter_intensity
                .map(|dc| format!("{:.1}", dc))
                .unwrap_or_else(|| "-".to_string()),
            index: slot.index.clone().unwrap_or_default(),
        })
        .collect();
    print_table(&rows);
    Ok(())
}

/// Trigger a refresh cycle
pub async fn trigger_refresh(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let outcome = client.refresh().await?;

    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    match outcome {
        RefreshOutcome::Completed(report) => {
            print_success(&format!(
                "Refreshed {} regions in {} ms",
                report.regions, report.elapsed_ms
            ));
            if report.fallbacks > 0 {
                print_warning(&format!(
                    "{} region(s) fell back to the default intensity",
                    report.fallbacks
                ));
            }
        }
        RefreshOutcome::Skipped => {
            print_info("A refresh is already running; trigger skipped");
        }
    }
    Ok(())
}
