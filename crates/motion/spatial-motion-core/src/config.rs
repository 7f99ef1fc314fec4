//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tick cadence and emission policy for a `Scheduler`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Updates per second.
    pub tick_rate: f64,
    /// Upper bound accepted by `set_tick_rate`.
    pub max_tick_rate: f64,
    /// Report the frozen position of paused instances every tick instead of
    /// skipping them.
    pub emit_paused_positions: bool,
    /// Fraction of a tick period a tick may spend computing before the
    /// driver logs an overrun.
    pub overrun_warning_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50.0,
            max_tick_rate: 240.0,
            emit_paused_positions: false,
            overrun_warning_ratio: 0.5,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.max_tick_rate.is_finite() || self.max_tick_rate <= 0.0 {
            return Err(ValidationError::InvalidTickRate {
                rate: self.max_tick_rate,
                max: self.max_tick_rate,
            });
        }
        check_tick_rate(self.tick_rate, self.max_tick_rate)
    }

    /// Tick period in wall-clock units.
    #[inline]
    pub fn tick_interval(&self) -> f64 {
        crate::timing::seconds_to_wall(1.0 / self.tick_rate)
    }
}

pub(crate) fn check_tick_rate(rate: f64, max: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate <= 0.0 || rate > max {
        return Err(ValidationError::InvalidTickRate { rate, max });
    }
    Ok(())
}
