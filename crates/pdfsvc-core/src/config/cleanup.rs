//! Deferred-deletion scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the background cleanup scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Whether the cleanup scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in minutes between sweeps of the deadline queue.
    #[serde(default = "default_sweep_period")]
    pub sweep_period_minutes: u64,
    /// Maximum deferral horizon in hours accepted by a registration.
    #[serde(default = "default_max_delay")]
    pub max_delay_hours: u64,
    /// Delay in seconds applied to leftovers found by the startup
    /// recovery scan.
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay_seconds: u64,
}

impl CleanupConfig {
    /// Interval between sweeps as a [`Duration`].
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_minutes * 60)
    }

    /// Maximum accepted deferral as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_hours * 3600)
    }

    /// Grace period for recovered leftovers as a [`Duration`].
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.recovery_delay_seconds)
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sweep_period_minutes: default_sweep_period(),
            max_delay_hours: default_max_delay(),
            recovery_delay_seconds: default_recovery_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_period() -> u64 {
    15
}

fn default_max_delay() -> u64 {
    24
}

fn default_recovery_delay() -> u64 {
    60
}
