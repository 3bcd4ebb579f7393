//! Reduction-counted, work-stealing scheduler
//!
//! TigerStyle: Explicit budgets, bounded queues of responsibility, no
//! fatal paths.
//!
//! The scheduler owns one queue per worker. Producers enqueue executors
//! onto a uniformly random queue; each worker drains its own queue and
//! steals from peers when idle. A processing episode charges reductions per
//! message - one for a fast message, surcharged proportionally to wall time
//! for a slow one - and yields the worker once the budget is spent, so a
//! single busy actor cannot monopolize a worker.

use crate::executor::ActorExecutor;
use crate::worker::Worker;
use minnow_core::actor::{Actor, ActorId};
use minnow_core::config::SchedulerConfig;
use minnow_core::error::Result;
use minnow_core::io::IoContext;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One worker's run queue
///
/// Multi-producer (enqueue, re-enqueue, stealing peers) and multi-consumer
/// (owner and stealers). A short-held mutex per queue keeps the contract
/// without a specialized lock-free structure.
pub(crate) struct WorkerQueue<A: Actor> {
    entries: Mutex<VecDeque<Arc<ActorExecutor<A>>>>,
}

impl<A: Actor> WorkerQueue<A> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn offer(&self, executor: Arc<ActorExecutor<A>>) {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .push_back(executor);
    }

    pub(crate) fn poll(&self) -> Option<Arc<ActorExecutor<A>>> {
        self.entries.lock().expect("queue lock poisoned").pop_front()
    }

    fn remove_matching(&self, id: &ActorId) -> usize {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        let before = entries.len();
        entries.retain(|executor| {
            if executor.id() == id {
                executor.clear_queued();
                false
            } else {
                true
            }
        });
        before - entries.len()
    }

    fn clear(&self) -> usize {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        let removed = entries.len();
        for executor in entries.drain(..) {
            executor.clear_queued();
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("queue lock poisoned").len()
    }
}

/// Scheduler-wide counters
#[derive(Debug)]
pub(crate) struct SchedulerStats {
    pub(crate) enqueues: AtomicU64,
    pub(crate) episodes: AtomicU64,
    pub(crate) steals: AtomicU64,
    /// Successful own-queue polls, one slot per worker
    pub(crate) poll_hits: Vec<AtomicU64>,
}

impl SchedulerStats {
    fn new(num_workers: usize) -> Self {
        Self {
            enqueues: AtomicU64::new(0),
            episodes: AtomicU64::new(0),
            steals: AtomicU64::new(0),
            poll_hits: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Point-in-time view of the scheduler counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Executors offered to queues (including re-enqueues)
    pub enqueues: u64,
    /// Completed processing episodes
    pub episodes: u64,
    /// Executors taken from a peer's queue
    pub steals: u64,
    /// Successful own-queue polls, one slot per worker
    pub poll_hits: Vec<u64>,
}

/// Shared scheduler state: queues, config, counters, shutdown flag
pub(crate) struct SchedulerCore<A: Actor> {
    pub(crate) queues: Vec<WorkerQueue<A>>,
    pub(crate) config: SchedulerConfig,
    pub(crate) io: IoContext,
    pub(crate) shutdown: AtomicBool,
    pub(crate) stats: SchedulerStats,
}

impl<A: Actor> SchedulerCore<A> {
    /// Resume the executor and place it on a uniformly random queue
    pub(crate) fn offer(&self, executor: Arc<ActorExecutor<A>>) {
        executor.resume_execution();
        let idx = self.io.rng.gen_range(0, self.queues.len() as u64) as usize;
        debug!(actor_id = %executor.id(), queue = idx, "Executor enqueued");
        self.queues[idx].offer(executor);
        self.stats.enqueues.fetch_add(1, Ordering::Relaxed);
    }

    /// Drive one executor for one episode
    ///
    /// Dequeues mailbox messages, charging reductions per message, until
    /// the actor is deactivated, the mailbox drains, or the budget is
    /// spent. An executor that still has work is suspended and re-enqueued
    /// onto a fresh random queue; a drained executor goes dormant until the
    /// facade enqueues it again.
    pub(crate) async fn process_actor(&self, executor: Arc<ActorExecutor<A>>) {
        executor.resume_execution();

        if !executor.try_begin_episode() {
            // Double pop of the same executor would break the
            // single-writer guarantee on actor state; never drive it twice.
            debug!(actor_id = %executor.id(), "Episode already in flight, skipping");
            return;
        }

        let max_reductions = u64::from(self.config.max_reductions);
        let threshold_ns = self.config.process_time_threshold_ms * 1_000_000;
        let mut reductions: u64 = 0;

        while executor.is_active() && executor.has_messages() && reductions < max_reductions {
            let Some(msg) = executor.dequeue_message() else {
                // Raced with a drain; treat as empty.
                break;
            };

            let start_ns = self.io.time.monotonic_ns();
            executor.process_message(msg).await;
            let elapsed_ns = self.io.time.monotonic_ns().saturating_sub(start_ns);

            reductions = reductions.saturating_add(reduction_charge(
                elapsed_ns,
                threshold_ns,
                u64::from(self.config.time_penalty_factor),
            ));
        }

        executor.end_episode();
        self.stats.episodes.fetch_add(1, Ordering::Relaxed);

        if executor.is_active() && executor.has_messages() {
            // Budget spent or batch cut short with work remaining.
            ActorExecutor::suspend_execution(&executor);
            self.offer(executor);
        } else {
            executor.clear_queued();
            // A producer may have posted after the final mailbox check and
            // lost the enqueue race while we still held the queued flag.
            if executor.is_active() && executor.has_messages() && executor.try_mark_queued() {
                self.offer(executor);
            }
        }
    }
}

/// Reductions charged for one message
///
/// One reduction for a message within the threshold; otherwise one plus a
/// penalty per full threshold of wall time, so expensive messages consume
/// budget proportional to how long they actually held the worker.
fn reduction_charge(elapsed_ns: u64, threshold_ns: u64, penalty_factor: u64) -> u64 {
    if elapsed_ns / 1_000_000 <= threshold_ns / 1_000_000 {
        1
    } else {
        1 + (elapsed_ns / threshold_ns) * penalty_factor
    }
}

/// Work-stealing scheduler over a pool of worker tasks
///
/// Construct inside a tokio runtime; workers are spawned immediately and
/// run until [`shutdown`](Self::shutdown) or drop.
pub struct Scheduler<A: Actor> {
    core: Arc<SchedulerCore<A>>,
    workers: Vec<JoinHandle<()>>,
}

impl<A: Actor> Scheduler<A> {
    /// Validate the configuration, build the queues, and launch workers
    pub fn new(config: SchedulerConfig, io: IoContext) -> Result<Self> {
        config.validate()?;

        let num_workers = config.num_workers;
        let core = Arc::new(SchedulerCore {
            queues: (0..num_workers).map(|_| WorkerQueue::new()).collect(),
            stats: SchedulerStats::new(num_workers),
            config,
            io,
            shutdown: AtomicBool::new(false),
        });

        let workers = (0..num_workers)
            .map(|worker_id| tokio::spawn(Worker::new(worker_id, Arc::clone(&core)).run()))
            .collect();

        info!(num_workers, "Scheduler started");
        Ok(Self { core, workers })
    }

    /// Offer an executor for scheduling
    ///
    /// Resumes the executor and places it on a random worker queue. An
    /// executor that is already queued or mid-episode is left where it is,
    /// so it never occupies two queues at once. Offers after shutdown are
    /// dropped with a warning.
    pub fn enqueue(&self, executor: Arc<ActorExecutor<A>>) {
        if self.core.shutdown.load(Ordering::SeqCst) {
            warn!(actor_id = %executor.id(), "Enqueue after shutdown, dropping");
            return;
        }

        if !executor.try_mark_queued() {
            return;
        }

        self.core.offer(executor);
    }

    /// Drop every queued entry for the given actor
    ///
    /// Scans all queues linearly; removal is rare and the queue count is
    /// tiny. Does not touch an episode already in flight. Returns whether
    /// at least one entry was removed.
    pub fn remove_actor(&self, id: &ActorId) -> bool {
        let mut removed = 0;
        for queue in &self.core.queues {
            removed += queue.remove_matching(id);
        }

        if removed == 0 {
            warn!(actor_id = %id, "remove_actor: no queued entries");
            false
        } else {
            debug!(actor_id = %id, removed, "Removed queued entries");
            true
        }
    }

    /// Drop every pending executor from every queue
    ///
    /// Does not cancel episodes already in flight.
    pub fn clean_all_worker_queues(&self) {
        let mut removed = 0;
        for queue in &self.core.queues {
            removed += queue.clear();
        }
        info!(removed, "Cleared all worker queues");
    }

    /// Pending executors per queue
    pub fn queue_depths(&self) -> Vec<usize> {
        self.core.queues.iter().map(WorkerQueue::len).collect()
    }

    /// Snapshot of the scheduler counters
    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            enqueues: self.core.stats.enqueues.load(Ordering::Relaxed),
            episodes: self.core.stats.episodes.load(Ordering::Relaxed),
            steals: self.core.stats.steals.load(Ordering::Relaxed),
            poll_hits: self
                .core
                .stats
                .poll_hits
                .iter()
                .map(|hits| hits.load(Ordering::Relaxed))
                .collect(),
        }
    }

    /// Stop accepting enqueues and wait for the workers to exit
    ///
    /// Pending queue entries are left in place; in-flight episodes finish
    /// normally before their worker observes the flag.
    pub async fn shutdown(&mut self) {
        self.core.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        info!("Scheduler stopped");
    }
}

impl<A: Actor> Drop for Scheduler<A> {
    fn drop(&mut self) {
        // Cannot await in drop; workers still running are aborted.
        self.core.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use minnow_core::actor::{ActorId, ChannelSink, NoopSink, ReplySink};
    use minnow_core::io::{RngProvider, TimeProvider, WallClockTime};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TallyState {
        total: u64,
    }

    /// Adds each message to a running total; replies (message, new total).
    struct TallyActor;

    #[async_trait]
    impl Actor for TallyActor {
        type State = TallyState;
        type Message = u64;
        type Reply = (u64, u64);

        async fn on_receive(
            &self,
            msg: u64,
            mut state: TallyState,
        ) -> minnow_core::Result<(TallyState, (u64, u64))> {
            state.total += msg;
            let total = state.total;
            Ok((state, (msg, total)))
        }
    }

    /// Sleeps a couple of milliseconds per message before tallying.
    struct SlowTallyActor;

    #[async_trait]
    impl Actor for SlowTallyActor {
        type State = TallyState;
        type Message = u64;
        type Reply = (u64, u64);

        async fn on_receive(
            &self,
            msg: u64,
            mut state: TallyState,
        ) -> minnow_core::Result<(TallyState, (u64, u64))> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            state.total += msg;
            let total = state.total;
            Ok((state, (msg, total)))
        }
    }

    /// RNG that always selects queue 0.
    #[derive(Debug)]
    struct ZeroRng;

    impl RngProvider for ZeroRng {
        fn next_u64(&self) -> u64 {
            0
        }
    }

    /// Clock whose monotonic readings advance a fixed step per call. An
    /// episode samples the clock once before and once after each message,
    /// so every message appears to take exactly `step_ns`.
    #[derive(Debug)]
    struct SteppingClock {
        ns: AtomicU64,
        step_ns: u64,
    }

    impl SteppingClock {
        fn new(step_ns: u64) -> Self {
            Self {
                ns: AtomicU64::new(0),
                step_ns,
            }
        }
    }

    #[async_trait]
    impl TimeProvider for SteppingClock {
        fn now_ms(&self) -> u64 {
            self.ns.load(Ordering::Relaxed) / 1_000_000
        }

        fn monotonic_ns(&self) -> u64 {
            self.ns.fetch_add(self.step_ns, Ordering::Relaxed)
        }

        async fn sleep_ms(&self, _ms: u64) {
            // Keep idle workers responsive without real 10 ms waits.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn test_config(max_reductions: u32, num_workers: usize) -> SchedulerConfig {
        SchedulerConfig {
            max_reductions,
            num_workers,
            ..Default::default()
        }
    }

    fn tally_executor(
        id: &str,
        sink: Arc<dyn ReplySink<(u64, u64)>>,
    ) -> Arc<ActorExecutor<TallyActor>> {
        Arc::new(ActorExecutor::new(
            ActorId::new(id).unwrap(),
            TallyActor,
            sink,
            None,
            Arc::new(WallClockTime::new()),
        ))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[test]
    fn test_reduction_charge_fast_message() {
        // 3 ms at a 10 ms threshold: one reduction.
        assert_eq!(reduction_charge(3_000_000, 10_000_000, 2), 1);
        // Exactly at the threshold still counts as fast.
        assert_eq!(reduction_charge(10_000_000, 10_000_000, 2), 1);
    }

    #[test]
    fn test_reduction_charge_slow_message() {
        // 30 ms at a 10 ms threshold with 2x penalty: 1 + 3 * 2.
        assert_eq!(reduction_charge(30_000_000, 10_000_000, 2), 7);
        // 11 ms: one full threshold overrun.
        assert_eq!(reduction_charge(11_000_000, 10_000_000, 2), 3);
    }

    #[tokio::test]
    async fn test_fifo_single_actor() {
        let (sink, mut rx) = ChannelSink::new();
        let scheduler = Scheduler::new(test_config(100, 2), IoContext::production()).unwrap();
        let executor = tally_executor("fifo", Arc::new(sink));

        for msg in 1..=5u64 {
            executor.post(msg);
        }
        scheduler.enqueue(executor.clone());

        let mut seen = Vec::new();
        for _ in 0..5 {
            let (_, (msg, _)) = rx.recv().await.unwrap();
            seen.push(msg);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(executor.state().await.total, 15);
    }

    #[tokio::test]
    async fn test_preemption_by_count() {
        let (sink, mut rx) = ChannelSink::new();
        let scheduler = Scheduler::new(test_config(3, 1), IoContext::production()).unwrap();
        let executor = tally_executor("preempt-count", Arc::new(sink));

        for _ in 0..10 {
            executor.post(1);
        }
        scheduler.enqueue(executor.clone());

        for _ in 0..10 {
            rx.recv().await.unwrap();
        }

        // 10 fast messages on a budget of 3: four episodes (3 + 3 + 3 + 1).
        let executor_for_wait = executor.clone();
        wait_until(move || executor_for_wait.stats().episodes == 4).await;
        assert_eq!(executor.stats().episodes, 4);
        assert_eq!(executor.stats().messages_processed, 10);
        drop(scheduler);
    }

    #[tokio::test]
    async fn test_preemption_by_time() {
        // Every message appears to take 30 ms against a 10 ms threshold with
        // a 2x penalty: 7 reductions each, so a budget of 10 admits exactly
        // two messages per episode.
        let clock = Arc::new(SteppingClock::new(30_000_000));
        let io = IoContext::new(clock, Arc::new(ZeroRng));

        let (sink, mut rx) = ChannelSink::new();
        let scheduler = Scheduler::new(test_config(10, 1), io).unwrap();
        let executor = tally_executor("preempt-time", Arc::new(sink));

        for _ in 0..5 {
            executor.post(1);
        }
        scheduler.enqueue(executor.clone());

        for _ in 0..5 {
            rx.recv().await.unwrap();
        }

        // 5 messages at 2 per episode: 2 + 2 + 1.
        let executor_for_wait = executor.clone();
        wait_until(move || executor_for_wait.stats().episodes == 3).await;
        assert_eq!(executor.stats().episodes, 3);
        drop(scheduler);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_work_stealing_drains_hot_queue() {
        // Force every enqueue onto queue 0; idle workers must steal.
        let io = IoContext::new(Arc::new(WallClockTime::new()), Arc::new(ZeroRng));

        let (sink, mut rx) = ChannelSink::new();
        let sink: Arc<dyn ReplySink<(u64, u64)>> = Arc::new(sink);
        let scheduler = Scheduler::new(test_config(100, 4), io).unwrap();

        let mut executors = Vec::new();
        for i in 0..8 {
            let executor = Arc::new(ActorExecutor::new(
                ActorId::new(format!("steal-{}", i)).unwrap(),
                SlowTallyActor,
                sink.clone(),
                None,
                Arc::new(WallClockTime::new()),
            ));
            for _ in 0..5 {
                executor.post(1);
            }
            executors.push(executor);
        }
        for executor in &executors {
            scheduler.enqueue(executor.clone());
        }

        for _ in 0..40 {
            rx.recv().await.unwrap();
        }

        let metrics = scheduler.metrics();
        assert!(metrics.steals > 0, "no steals recorded: {:?}", metrics);
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 0);
        for executor in &executors {
            assert_eq!(executor.state().await.total, 5);
        }
    }

    #[tokio::test]
    async fn test_drained_executor_goes_dormant() {
        // Budget and batch size coincide: the drained mailbox wins and the
        // executor is not re-enqueued.
        let (sink, mut rx) = ChannelSink::new();
        let scheduler = Scheduler::new(test_config(3, 1), IoContext::production()).unwrap();
        let executor = tally_executor("dormant", Arc::new(sink));

        for _ in 0..3 {
            executor.post(1);
        }
        scheduler.enqueue(executor.clone());

        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        let executor_for_wait = executor.clone();
        wait_until(move || executor_for_wait.stats().episodes == 1).await;

        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 0);
        assert!(!executor.has_messages());

        // A fresh post plus enqueue wakes it again.
        executor.post(4);
        scheduler.enqueue(executor.clone());
        let (_, (msg, total)) = rx.recv().await.unwrap();
        assert_eq!((msg, total), (4, 7));
        drop(scheduler);
    }

    #[tokio::test]
    async fn test_enqueue_is_membership_exclusive() {
        // Current-thread runtime: workers cannot run between the calls
        // below, so the queue contents are observable synchronously.
        let scheduler = Scheduler::new(test_config(10, 2), IoContext::production()).unwrap();
        let executor = tally_executor("member", Arc::new(NoopSink));

        executor.post(1);
        scheduler.enqueue(executor.clone());
        scheduler.enqueue(executor.clone());
        scheduler.enqueue(executor.clone());

        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_remove_actor_drops_queued_entries() {
        let scheduler = Scheduler::new(test_config(10, 2), IoContext::production()).unwrap();

        let kept = tally_executor("kept", Arc::new(NoopSink));
        let removed = tally_executor("removed", Arc::new(NoopSink));
        kept.post(1);
        removed.post(1);
        scheduler.enqueue(kept.clone());
        scheduler.enqueue(removed.clone());

        assert!(scheduler.remove_actor(removed.id()));
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 1);

        // Unknown actor: nothing to remove.
        assert!(!scheduler.remove_actor(&ActorId::new("missing").unwrap()));

        // The removed executor can be offered again later.
        scheduler.enqueue(removed.clone());
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 2);
    }

    #[tokio::test]
    async fn test_clean_all_worker_queues() {
        let scheduler = Scheduler::new(test_config(10, 3), IoContext::production()).unwrap();

        let mut executors = Vec::new();
        for i in 0..3 {
            let executor = tally_executor(&format!("clean-{}", i), Arc::new(NoopSink));
            executor.post(1);
            scheduler.enqueue(executor.clone());
            executors.push(executor);
        }
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 3);

        scheduler.clean_all_worker_queues();
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 0);

        // Flags were cleared: executors can be enqueued again.
        scheduler.enqueue(executors[0].clone());
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_workers_and_rejects_enqueues() {
        let mut scheduler = Scheduler::new(test_config(10, 2), IoContext::production()).unwrap();
        scheduler.shutdown().await;

        let executor = tally_executor("late", Arc::new(NoopSink));
        executor.post(1);
        scheduler.enqueue(executor);
        assert_eq!(scheduler.queue_depths().iter().sum::<usize>(), 0);
    }
}
