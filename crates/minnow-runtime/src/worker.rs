//! Worker loop
//!
//! Each worker drains its own queue, steals from peers when idle, and
//! sleeps briefly when there is nothing to do anywhere. The loop only exits
//! on scheduler shutdown.

use crate::executor::ActorExecutor;
use crate::scheduler::SchedulerCore;
use minnow_core::actor::Actor;
use minnow_core::constants::WORKER_IDLE_SLEEP_MS;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// One long-running scheduler worker
pub(crate) struct Worker<A: Actor> {
    worker_id: usize,
    core: Arc<SchedulerCore<A>>,
}

impl<A: Actor> Worker<A> {
    pub(crate) fn new(worker_id: usize, core: Arc<SchedulerCore<A>>) -> Self {
        debug_assert!(worker_id < core.queues.len());
        Self { worker_id, core }
    }

    /// Run until shutdown
    pub(crate) async fn run(self) {
        debug!(worker_id = self.worker_id, "Worker started");

        loop {
            if self.core.shutdown.load(Ordering::SeqCst) {
                break;
            }

            // 1. Own queue first.
            if let Some(executor) = self.core.queues[self.worker_id].poll() {
                self.core.stats.poll_hits[self.worker_id].fetch_add(1, Ordering::Relaxed);
                self.core.process_actor(executor).await;
                continue;
            }

            // 2. Steal from a peer.
            if let Some(executor) = self.steal_work() {
                self.core.stats.steals.fetch_add(1, Ordering::Relaxed);
                self.core.process_actor(executor).await;
                continue;
            }

            // 3. Nothing anywhere: sleep instead of spinning.
            self.core.io.time.sleep_ms(WORKER_IDLE_SLEEP_MS).await;
        }

        debug!(worker_id = self.worker_id, "Worker stopped");
    }

    /// Poll peer queues in index order, skipping our own
    ///
    /// Returns the first executor found. A linear scan is fine: the queue
    /// count matches the CPU count.
    fn steal_work(&self) -> Option<Arc<ActorExecutor<A>>> {
        for (victim, queue) in self.core.queues.iter().enumerate() {
            if victim == self.worker_id {
                continue;
            }
            if let Some(executor) = queue.poll() {
                return Some(executor);
            }
        }
        None
    }
}
