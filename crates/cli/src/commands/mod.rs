//! CLI subcommand implementations

pub mod advisory;
pub mod estimate;
pub mod regions;
