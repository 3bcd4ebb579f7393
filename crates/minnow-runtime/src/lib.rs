//! minnow runtime
//!
//! Scheduler and actor execution engine for minnow.
//!
//! # Overview
//!
//! The runtime provides:
//! - Per-actor FIFO mailboxes
//! - Actor executors with suspend/resume lifecycle and error absorption
//! - A preemptive, reduction-counted, work-stealing scheduler
//! - An actor system facade owning the executor registry
//!
//! # Scheduling model
//!
//! Each of the scheduler's workers owns one queue of runnable executors.
//! An idle worker steals from its peers before sleeping. Driving an
//! executor charges one reduction per message, surcharged in proportion to
//! wall time for slow messages; when the episode budget is spent the
//! executor is suspended and re-enqueued on a fresh random queue, giving
//! every runnable actor a fair share of the pool.
//!
//! # TigerStyle
//! - At most one queue membership and one in-flight episode per executor
//! - Explicit reduction budgets (no unbounded batches)
//! - A faulty message never unschedules its actor

pub mod executor;
pub mod mailbox;
pub mod scheduler;
pub mod system;

mod worker;

pub use executor::{ActorExecutor, ExecutorStatsSnapshot};
pub use mailbox::Mailbox;
pub use scheduler::{Scheduler, SchedulerMetrics};
pub use system::{ActorSystem, ActorSystemBuilder};
