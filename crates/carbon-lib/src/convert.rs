//! Grid <-> datacenter intensity conversion
//!
//! Datacenter intensity is the raw grid signal scaled down by the cloud
//! operator's purchased renewable share and up by facility overhead (PUE).

/// Power usage effectiveness applied to every datacenter conversion
pub const DATACENTER_PUE: f64 = 1.135;

/// Renewable fraction assumed for regions without a configured value
pub const DEFAULT_RENEWABLE_FRACTION: f64 = 0.70;

/// Renewable fraction assumed for the reference region
pub const REFERENCE_RENEWABLE_FRACTION: f64 = 0.80;

/// Upper clamp keeping the inverse conversion finite
const MAX_RENEWABLE_FRACTION: f64 = 0.999;

/// Clamp a renewable fraction into `[0, 0.999]`
pub fn clamp_renewable_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return DEFAULT_RENEWABLE_FRACTION;
    }
    fraction.clamp(0.0, MAX_RENEWABLE_FRACTION)
}

/// Resolve the renewable fraction for a region, falling back to defaults
pub fn effective_renewable_fraction(configured: Option<f64>, is_reference: bool) -> f64 {
    let fraction = configured.unwrap_or(if is_reference {
        REFERENCE_RENEWABLE_FRACTION
    } else {
        DEFAULT_RENEWABLE_FRACTION
    });
    clamp_renewable_fraction(fraction)
}

/// Grid intensity to datacenter intensity, rounded to one decimal
pub fn grid_to_datacenter(grid_intensity: f64, renewable_fraction: f64) -> f64 {
    let rf = clamp_renewable_fraction(renewable_fraction);
    let dc = non_negative(grid_intensity) * (1.0 - rf) * DATACENTER_PUE;
    round_to_tenth(dc)
}

/// Datacenter intensity back to grid intensity, rounded to a whole number
pub fn datacenter_to_grid(datacenter_intensity: f64, renewable_fraction: f64) -> f64 {
    let rf = clamp_renewable_fraction(renewable_fraction);
    (non_negative(datacenter_intensity) / ((1.0 - rf) * DATACENTER_PUE)).round()
}

/// Make grid and datacenter values mutually consistent
///
/// A provider-supplied datacenter value is authoritative and is returned
/// untouched (apart from the `>= 0`, one-decimal invariant); the grid value is
/// only back-computed when it is missing. Returns `None` when neither is known.
pub fn reconcile(
    grid_intensity: Option<f64>,
    datacenter_intensity: Option<f64>,
    renewable_fraction: f64,
) -> Option<(f64, f64)> {
    match (grid_intensity, datacenter_intensity) {
        (Some(grid), Some(dc)) => Some((non_negative(grid), round_to_tenth(non_negative(dc)))),
        (Some(grid), None) => Some((non_negative(grid), grid_to_datacenter(grid, renewable_fraction))),
        (None, Some(dc)) => {
            let dc = round_to_tenth(non_negative(dc));
            Some((datacenter_to_grid(dc, renewable_fraction), dc))
        }
        (None, None) => None,
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
