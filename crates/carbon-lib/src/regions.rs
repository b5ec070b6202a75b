//! Built-in region catalog

use crate::models::RegionMetadata;

/// Region backed by the national grid authority with published forecasts
pub const DEFAULT_REFERENCE_REGION: &str = "eu-west-2";

fn region(
    code: &str,
    location: &str,
    country: &str,
    latitude: f64,
    longitude: f64,
    renewable_fraction: Option<f64>,
) -> RegionMetadata {
    RegionMetadata {
        region_code: code.to_string(),
        location: location.to_string(),
        country_code: country.to_string(),
        latitude,
        longitude,
        renewable_fraction,
    }
}

/// The default set of monitored AWS regions
pub fn default_regions() -> Vec<RegionMetadata> {
    vec![
        region("us-east-1", "N. Virginia", "USA", 38.13, -78.45, Some(0.65)),
        region("us-west-2", "Oregon", "USA", 45.84, -119.70, Some(0.90)),
        region("eu-west-1", "Ireland", "IRL", 53.35, -6.26, Some(0.85)),
        region("eu-west-2", "London", "GBR", 51.51, -0.13, None),
        region("eu-central-1", "Frankfurt", "DEU", 50.11, 8.68, Some(0.75)),
        region("eu-north-1", "Stockholm", "SWE", 59.33, 18.07, Some(0.95)),
        region("ap-southeast-2", "Sydney", "AUS", -33.87, 151.21, None),
        region("ap-northeast-1", "Tokyo", "JPN", 35.68, 139.69, None),
    ]
}

/// Look up a region by code
pub fn find_region<'a>(regions: &'a [RegionMetadata], code: &str) -> Option<&'a RegionMetadata> {
    regions.iter().find(|r| r.region_code == code)
}
