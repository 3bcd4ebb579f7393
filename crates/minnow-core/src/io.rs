//! I/O abstraction layer for deterministic tests
//!
//! TigerStyle: All non-deterministic inputs go through abstraction traits.
//!
//! The scheduler depends on two sources of non-determinism: wall-clock time
//! (reduction surcharges for slow messages) and randomness (worker queue
//! selection). Both are injected so the same scheduling code runs under
//! production clocks and under scripted test clocks.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ============================================================================
// Time Provider
// ============================================================================

/// Time provider abstraction
///
/// All code that needs current time, durations, or sleeps MUST use this
/// trait. Never call `std::time::Instant::now()` directly from scheduling
/// code.
#[async_trait]
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in milliseconds since epoch
    fn now_ms(&self) -> u64;

    /// Get a monotonic timestamp in nanoseconds (for measuring durations)
    fn monotonic_ns(&self) -> u64;

    /// Sleep for the specified duration
    async fn sleep_ms(&self, ms: u64);
}

/// Anchor for monotonic readings, taken once per process
static MONOTONIC_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

/// Production time provider using the system clock
#[derive(Debug, Clone, Default)]
pub struct WallClockTime;

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeProvider for WallClockTime {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn monotonic_ns(&self) -> u64 {
        MONOTONIC_ANCHOR.elapsed().as_nanos() as u64
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }
}

// ============================================================================
// RNG Provider
// ============================================================================

/// Random number generator abstraction
///
/// Uniform distribution is sufficient for queue selection; nothing here is
/// cryptographic.
pub trait RngProvider: Send + Sync + std::fmt::Debug {
    /// Generate a random u64
    fn next_u64(&self) -> u64;

    /// Generate a random u64 in range [min, max)
    fn gen_range(&self, min: u64, max: u64) -> u64 {
        assert!(min < max, "min must be less than max");
        let range = max - min;
        min + (self.next_u64() % range)
    }
}

/// Production RNG provider
///
/// xorshift64* behind an atomic counter: thread-safe without locks, not
/// cryptographically secure.
#[derive(Debug)]
pub struct StdRngProvider {
    state: AtomicU64,
}

impl Default for StdRngProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StdRngProvider {
    /// Create a new RNG provider seeded from system time
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        Self::with_seed(seed)
    }

    /// Create with a specific seed (for testing)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: AtomicU64::new(if seed == 0 { 1 } else { seed }),
        }
    }
}

impl RngProvider for StdRngProvider {
    fn next_u64(&self) -> u64 {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            let mut x = state;
            x ^= x >> 12;
            x ^= x << 25;
            x ^= x >> 27;

            match self
                .state
                .compare_exchange_weak(state, x, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return x.wrapping_mul(0x2545F4914F6CDD1D),
                Err(s) => state = s,
            }
        }
    }
}

// ============================================================================
// I/O Context
// ============================================================================

/// Bundle of all I/O providers
///
/// Pass this through the runtime instead of individual providers. Makes it
/// easy to swap between production and test modes.
#[derive(Clone)]
pub struct IoContext {
    /// Time provider
    pub time: Arc<dyn TimeProvider>,
    /// RNG provider
    pub rng: Arc<dyn RngProvider>,
}

impl std::fmt::Debug for IoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoContext")
            .field("time", &self.time)
            .field("rng", &self.rng)
            .finish()
    }
}

impl Default for IoContext {
    fn default() -> Self {
        Self::production()
    }
}

impl IoContext {
    /// Create production I/O context with real wall clock and RNG
    pub fn production() -> Self {
        Self {
            time: Arc::new(WallClockTime::new()),
            rng: Arc::new(StdRngProvider::new()),
        }
    }

    /// Create I/O context with custom providers
    pub fn new(time: Arc<dyn TimeProvider>, rng: Arc<dyn RngProvider>) -> Self {
        Self { time, rng }
    }
}

// ============================================================================
// Tests
// ============================================================================
