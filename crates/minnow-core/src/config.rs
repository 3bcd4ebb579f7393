//! Configuration for minnow
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Scheduler configuration
///
/// Defaults follow the constants module: a 2000-reduction budget, one worker
/// per CPU, a 10 ms slow-message threshold, and a 2x penalty factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Reduction budget for a single processing episode
    #[serde(default = "default_max_reductions")]
    pub max_reductions: u32,

    /// Number of worker tasks and worker queues
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Wall-clock threshold above which a message is surcharged (milliseconds)
    #[serde(default = "default_process_time_threshold_ms")]
    pub process_time_threshold_ms: u64,

    /// Multiplier applied per threshold overrun of a slow message
    #[serde(default = "default_time_penalty_factor")]
    pub time_penalty_factor: u32,
}

fn default_max_reductions() -> u32 {
    REDUCTIONS_PER_EPISODE_DEFAULT
}

fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(SCHEDULER_WORKERS_COUNT_FALLBACK)
}

fn default_process_time_threshold_ms() -> u64 {
    PROCESS_TIME_THRESHOLD_MS_DEFAULT
}

fn default_time_penalty_factor() -> u32 {
    TIME_PENALTY_FACTOR_DEFAULT
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_reductions: default_max_reductions(),
            num_workers: default_num_workers(),
            process_time_threshold_ms: default_process_time_threshold_ms(),
            time_penalty_factor: default_time_penalty_factor(),
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with an explicit reduction budget
    ///
    /// Remaining fields take their defaults.
    pub fn with_max_reductions(max_reductions: u32) -> Self {
        Self {
            max_reductions,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_reductions == 0 || self.max_reductions > REDUCTIONS_PER_EPISODE_MAX {
            return Err(Error::InvalidConfiguration {
                field: "max_reductions".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.max_reductions, REDUCTIONS_PER_EPISODE_MAX
                ),
            });
        }

        if self.num_workers == 0 || self.num_workers > SCHEDULER_WORKERS_COUNT_MAX {
            return Err(Error::InvalidConfiguration {
                field: "num_workers".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.num_workers, SCHEDULER_WORKERS_COUNT_MAX
                ),
            });
        }

        if self.process_time_threshold_ms == 0
            || self.process_time_threshold_ms > PROCESS_TIME_THRESHOLD_MS_MAX
        {
            return Err(Error::InvalidConfiguration {
                field: "process_time_threshold_ms".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.process_time_threshold_ms, PROCESS_TIME_THRESHOLD_MS_MAX
                ),
            });
        }

        if self.time_penalty_factor == 0 || self.time_penalty_factor > TIME_PENALTY_FACTOR_MAX {
            return Err(Error::InvalidConfiguration {
                field: "time_penalty_factor".into(),
                reason: format!(
                    "{} outside range 1..={}",
                    self.time_penalty_factor, TIME_PENALTY_FACTOR_MAX
                ),
            });
        }

        Ok(())
    }
}
