//! minnow core
//!
//! Core types, errors, and constants for the minnow actor runtime.
//!
//! # Overview
//!
//! minnow is a lightweight stateful actor runtime for resource-constrained
//! hosts. Actors own private state, receive messages one at a time, and emit
//! a new state plus a reply on each receipt. A small pool of worker tasks
//! drives many thousands of actors through a preemptive, reduction-counted,
//! work-stealing scheduler.
//!
//! This crate holds the shared contracts: the [`Actor`] trait, identifiers,
//! errors, configuration, the persistence and reply-sink collaborator
//! traits, and the time/RNG abstraction the scheduler uses for deterministic
//! tests.
//!
//! # TigerStyle
//!
//! This crate follows [TigerStyle](https://github.com/tigerbeetle/tigerbeetle/blob/main/docs/TIGER_STYLE.md)
//! engineering principles:
//! - Safety > Performance > Developer Experience
//! - Explicit limits with big-endian naming (e.g., `ACTOR_ID_LENGTH_BYTES_MAX`)
//! - No recursion (bounded iteration only)

pub mod actor;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod store;
pub mod telemetry;

pub use actor::{Actor, ActorId, ChannelSink, NoopSink, ReplySink};
pub use config::SchedulerConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use io::{IoContext, RngProvider, StdRngProvider, TimeProvider, WallClockTime};
pub use store::{MemoryStore, StateStore};
pub use telemetry::{init_telemetry, TelemetryConfig};
