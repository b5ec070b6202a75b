//! Time-shift advisory over the reference region's forecast
//!
//! A greedy single pass: find the cleanest slot in the horizon, fall back to
//! the earliest near-optimal future slot if the cleanest has already started,
//! then apply a hysteresis rule so small or distant gains do not cause churn.

use crate::convert::grid_to_datacenter;
use crate::models::{AdvisoryDecision, AdvisoryOutcome, AdvisoryTarget, ForecastSlot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of forecast slots considered (24h at half-hour resolution)
pub const FORECAST_HORIZON_SLOTS: usize = 48;

/// Tunable decision thresholds for the advisor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvisorThresholds {
    /// Savings at or above this always justify waiting
    pub strong_savings_percent: f64,
    /// Savings at or above this justify waiting when the wait is short
    pub modest_savings_percent: f64,
    /// "Short" wait for modest savings, exclusive upper bound
    pub modest_max_wait_hours: f64,
    /// Fractional window above the minimum that counts as near-optimal
    pub near_optimal_window: f64,
}

impl Default for AdvisorThresholds {
    fn default() -> Self {
        Self {
            strong_savings_percent: 15.0,
            modest_savings_percent: 10.0,
            modest_max_wait_hours: 3.0,
            near_optimal_window: 0.10,
        }
    }
}

impl AdvisorThresholds {
    /// Hysteresis rule deciding whether a saving is worth the wait
    pub fn should_wait(&self, savings_percent: f64, wait_hours: f64) -> bool {
        savings_percent >= self.strong_savings_percent
            || (savings_percent >= self.modest_savings_percent
                && wait_hours < self.modest_max_wait_hours)
    }
}

/// Savings of `target` relative to `current`, as a percentage
pub fn savings_percent(current: f64, target: f64) -> f64 {
    if current <= 0.0 {
        return 0.0;
    }
    (current - target) * 100.0 / current
}

/// Stateless run-now-or-defer advisor
#[derive(Debug, Clone, Default)]
pub struct TimeShiftAdvisor {
    thresholds: AdvisorThresholds,
}

impl TimeShiftAdvisor {
    pub fn new(thresholds: AdvisorThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AdvisorThresholds {
        &self.thresholds
    }

    /// Decide whether to run now or wait for a cleaner slot
    ///
    /// `current_intensity` is the region's resolved datacenter intensity, not
    /// necessarily the first forecast slot.
    pub fn advise(
        &self,
        region_code: &str,
        forecast: &[ForecastSlot],
        current_intensity: f64,
        renewable_fraction: f64,
        now: DateTime<Utc>,
    ) -> AdvisoryOutcome {
        let series: Vec<(&ForecastSlot, f64)> = forecast
            .iter()
            .take(FORECAST_HORIZON_SLOTS)
            .map(|slot| (slot, grid_to_datacenter(slot.grid_intensity, renewable_fraction)))
            .collect();

        let Some(&(first_slot, first_dc)) = series.first() else {
            return AdvisoryOutcome::NoForecastAvailable {
                region_code: region_code.to_string(),
            };
        };

        let (optimal_slot, global_min) =
            series
                .iter()
                .skip(1)
                .fold((first_slot, first_dc), |best, &(slot, dc)| {
                    if dc < best.1 {
                        (slot, dc)
                    } else {
                        best
                    }
                });

        let target = if optimal_slot.start_time < now {
            let ceiling = global_min * (1.0 + self.thresholds.near_optimal_window);
            series
                .iter()
                .find(|(slot, dc)| slot.start_time > now && *dc <= ceiling)
                .map(|&(slot, dc)| (slot, dc))
        } else {
            Some((optimal_slot, global_min))
        };

        let Some((slot, target_intensity)) = target else {
            return AdvisoryOutcome::Decision(AdvisoryDecision {
                should_wait: false,
                target: AdvisoryTarget::Now,
                expected_savings_percent: 0.0,
                wait_duration_minutes: 0,
                current_intensity,
                target_intensity: current_intensity,
            });
        };

        let wait_duration_minutes = (slot.start_time - now).num_minutes().max(0);
        let savings = savings_percent(current_intensity, target_intensity);
        let should_wait = current_intensity > target_intensity
            && self
                .thresholds
                .should_wait(savings, wait_duration_minutes as f64 / 60.0);

        let mut target_slot = slot.clone();
        target_slot.datacenter_intensity = Some(target_intensity);

        AdvisoryOutcome::Decision(AdvisoryDecision {
            should_wait,
            target: AdvisoryTarget::Slot(target_slot),
            expected_savings_percent: savings,
            wait_duration_minutes,
            current_intensity,
            target_intensity,
        })
    }
}
