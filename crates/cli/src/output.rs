//! Output formatting utilities

use carbon_lib::models::IntensityBand;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_intensity(intensity: f64) -> String {
    format!("{:.1} gCO2/kWh", intensity)
}

/// Format grams of CO2, switching to kilograms above 1 kg
pub fn format_grams(grams: f64) -> String {
    if grams >= 1000.0 {
        format!("{:.2} kgCO2e", grams / 1000.0)
    } else {
        format!("{:.2} gCO2e", grams)
    }
}

/// Format a wait as `2h 30m`
pub fn format_wait(minutes: i64) -> String {
    let minutes = minutes.max(0);
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Color a band label by severity
pub fn color_band(band: IntensityBand) -> String {
    let label = band.as_str();
    match band {
        IntensityBand::VeryLow => label.green().bold().to_string(),
        IntensityBand::Low => label.green().to_string(),
        IntensityBand::Moderate => label.yellow().to_string(),
        IntensityBand::High => label.red().to_string(),
        IntensityBand::VeryHigh => label.red().bold().to_string(),
    }
}
