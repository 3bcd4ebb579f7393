//! TigerStyle constants for minnow
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Actor Limits
// =============================================================================

/// Maximum length of an actor ID in bytes
pub const ACTOR_ID_LENGTH_BYTES_MAX: usize = 256;

/// Maximum size of a serialized actor state in bytes (10 MB)
pub const ACTOR_STATE_SIZE_BYTES_MAX: usize = 10 * 1024 * 1024;

// =============================================================================
// Scheduler Limits
// =============================================================================

/// Maximum number of scheduler workers
pub const SCHEDULER_WORKERS_COUNT_MAX: usize = 256;

/// Worker count used when available parallelism cannot be determined
pub const SCHEDULER_WORKERS_COUNT_FALLBACK: usize = 4;

/// Maximum reduction budget for a single processing episode
pub const REDUCTIONS_PER_EPISODE_MAX: u32 = 1_000_000;

/// Default reduction budget for a single processing episode
pub const REDUCTIONS_PER_EPISODE_DEFAULT: u32 = 2_000;

/// Default wall-clock threshold above which a message is surcharged (ms)
pub const PROCESS_TIME_THRESHOLD_MS_DEFAULT: u64 = 10;

/// Maximum wall-clock surcharge threshold (ms)
pub const PROCESS_TIME_THRESHOLD_MS_MAX: u64 = 60 * 1000;

/// Default multiplier applied per threshold overrun of a slow message
pub const TIME_PENALTY_FACTOR_DEFAULT: u32 = 2;

/// Maximum time penalty factor
pub const TIME_PENALTY_FACTOR_MAX: u32 = 1_000;

/// How long an idle worker sleeps between queue polls (ms)
pub const WORKER_IDLE_SLEEP_MS: u64 = 10;

// Compile-time assertions for constant validity
const _: () = {
    assert!(ACTOR_ID_LENGTH_BYTES_MAX >= 64);
    assert!(ACTOR_STATE_SIZE_BYTES_MAX <= 100 * 1024 * 1024); // <= 100 MB
    assert!(SCHEDULER_WORKERS_COUNT_FALLBACK <= SCHEDULER_WORKERS_COUNT_MAX);
    assert!(REDUCTIONS_PER_EPISODE_DEFAULT <= REDUCTIONS_PER_EPISODE_MAX);
    assert!(PROCESS_TIME_THRESHOLD_MS_DEFAULT >= 1);
    assert!(TIME_PENALTY_FACTOR_DEFAULT >= 1);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_have_units_in_names() {
        // This test documents the naming convention
        // All byte limits end in _BYTES_
        // All time limits end in _MS_
        // All count limits end in _COUNT_
        let _: usize = ACTOR_ID_LENGTH_BYTES_MAX;
        let _: u64 = PROCESS_TIME_THRESHOLD_MS_DEFAULT;
        let _: usize = SCHEDULER_WORKERS_COUNT_MAX;
    }

    #[test]
    fn test_default_budget_within_limit() {
        assert!(REDUCTIONS_PER_EPISODE_DEFAULT <= REDUCTIONS_PER_EPISODE_MAX);
    }
}
