//! Actor executor: binds one actor to its mailbox and state
//!
//! TigerStyle: Explicit scheduling flags, error absorption, single-episode
//! guarantee.
//!
//! An executor is shared between the scheduler (transient handles inside
//! worker queues) and the facade that owns the actor registry. The `queued`
//! flag keeps an executor in at most one worker queue; the `running` flag
//! asserts that at most one processing episode is ever in flight.

use crate::mailbox::Mailbox;
use bytes::Bytes;
use minnow_core::actor::{Actor, ActorId, ReplySink};
use minnow_core::error::{Error, Result};
use minnow_core::io::TimeProvider;
use minnow_core::store::StateStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Counters for one executor
///
/// Updated by whichever worker currently drives the executor; readable from
/// any thread.
#[derive(Debug, Default)]
struct ExecutorStats {
    /// Messages handed to the actor (including failed ones)
    messages_processed: AtomicU64,
    /// Messages whose handler returned an error
    handler_errors: AtomicU64,
    /// Completed processing episodes
    episodes: AtomicU64,
    /// Last time a message was processed (ms since epoch, 0 = never)
    last_activity_at_ms: AtomicU64,
}

/// Point-in-time view of an executor's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorStatsSnapshot {
    /// Messages handed to the actor (including failed ones)
    pub messages_processed: u64,
    /// Messages whose handler returned an error
    pub handler_errors: u64,
    /// Completed processing episodes
    pub episodes: u64,
    /// Last time a message was processed (ms since epoch)
    pub last_activity_at_ms: Option<u64>,
}

/// Runtime binding of one actor to one mailbox and scheduling flags
pub struct ActorExecutor<A: Actor> {
    /// The actor's unique identifier
    id: ActorId,
    /// The actor implementation
    actor: A,
    /// The actor's mailbox
    mailbox: Mailbox<A::Message>,
    /// The actor's private state
    ///
    /// Held across the handler's await points; the queued/running protocol
    /// guarantees a single logical writer.
    state: Mutex<A::State>,
    /// False once the actor is administratively removed
    active: AtomicBool,
    /// True while the scheduler has parked the executor between batches
    suspended: AtomicBool,
    /// True from enqueue until the driving episode decides dormancy;
    /// enforces at-most-one queue membership
    queued: AtomicBool,
    /// True while a processing episode is in flight
    running: AtomicBool,
    /// Destination for replies
    sink: Arc<dyn ReplySink<A::Reply>>,
    /// Optional persistence collaborator
    store: Option<Arc<dyn StateStore>>,
    /// Counters
    stats: ExecutorStats,
    /// Time provider for activity stamps
    time: Arc<dyn TimeProvider>,
}

impl<A: Actor> ActorExecutor<A> {
    /// Create an executor with default state
    ///
    /// When a store is supplied, call [`hydrate`](Self::hydrate) before the
    /// first enqueue to pick up previously saved state.
    pub fn new(
        id: ActorId,
        actor: A,
        sink: Arc<dyn ReplySink<A::Reply>>,
        store: Option<Arc<dyn StateStore>>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            id,
            actor,
            mailbox: Mailbox::new(),
            state: Mutex::new(A::State::default()),
            active: AtomicBool::new(true),
            suspended: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            running: AtomicBool::new(false),
            sink,
            store,
            stats: ExecutorStats::default(),
            time,
        }
    }

    /// The actor's identifier
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Load previously saved state from the store, if any
    ///
    /// Missing or undecodable state falls back to the default so a storage
    /// problem never blocks scheduling.
    pub async fn hydrate(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        match store.load(&self.id).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<A::State>(&bytes) {
                Ok(saved) => {
                    *self.state.lock().await = saved;
                    debug!(actor_id = %self.id, "Loaded state from store");
                }
                Err(e) => {
                    warn!(actor_id = %self.id, error = %e, "Saved state undecodable, using default");
                }
            },
            Ok(None) => {
                debug!(actor_id = %self.id, "No saved state, using default");
            }
            Err(e) => {
                warn!(actor_id = %self.id, error = %e, "Failed to load state, using default");
            }
        }
        Ok(())
    }

    /// Serialize current state and write it to the store
    ///
    /// No-op without a store.
    pub async fn flush_state(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let bytes = {
            let state = self.state.lock().await;
            serde_json::to_vec(&*state).map_err(|e| Error::SerializationFailed {
                reason: format!("actor state: {}", e),
            })?
        };

        store
            .save(&self.id, Bytes::from(bytes))
            .await
            .map_err(|e| Error::storage_write_failed(self.id.as_str(), e.to_string()))?;

        debug!(actor_id = %self.id, "Saved state to store");
        Ok(())
    }

    /// Append a message to the mailbox
    pub fn post(&self, msg: A::Message) {
        self.mailbox.post(msg);
    }

    /// Remove the next message from the mailbox
    pub fn dequeue_message(&self) -> Option<A::Message> {
        self.mailbox.dequeue()
    }

    /// Whether the mailbox holds undelivered messages
    pub fn has_messages(&self) -> bool {
        self.mailbox.has_messages()
    }

    /// Number of undelivered messages
    pub fn pending_message_count(&self) -> usize {
        self.mailbox.len()
    }

    /// Whether the executor is eligible to run
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Administratively enable or disable the executor
    ///
    /// A deactivated executor is skipped by episodes and never re-enqueued.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether the executor is parked between message batches
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Park the executor between message batches
    ///
    /// Idempotent. The first transition initiates a state flush to the
    /// configured store on a separate task; the caller never waits on it.
    pub fn suspend_execution(executor: &Arc<Self>) {
        if executor.suspended.swap(true, Ordering::SeqCst) {
            return;
        }

        if executor.store.is_some() {
            let executor = Arc::clone(executor);
            tokio::spawn(async move {
                if let Err(e) = executor.flush_state().await {
                    warn!(actor_id = %executor.id, error = %e, "State flush on suspend failed");
                }
            });
        }
    }

    /// Clear the suspended flag
    ///
    /// Idempotent; called both on enqueue and at the head of an episode.
    pub fn resume_execution(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    /// Claim queue membership. Returns false if already queued or running.
    pub(crate) fn try_mark_queued(&self) -> bool {
        self.queued
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release queue membership (episode decided dormancy, or the entry was
    /// dropped from a queue)
    pub(crate) fn clear_queued(&self) {
        self.queued.store(false, Ordering::SeqCst);
    }

    /// Mark the start of a processing episode. Returns false if another
    /// episode is already in flight.
    pub(crate) fn try_begin_episode(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the end of a processing episode
    pub(crate) fn end_episode(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        debug_assert!(was_running, "end_episode without begin");
        self.stats.episodes.fetch_add(1, Ordering::Relaxed);
    }

    /// Hand one message to the actor
    ///
    /// On success the returned state replaces the current one and the reply
    /// goes to the sink. On failure the message is dropped, the previous
    /// state is retained, and the fault is logged - a bad message never
    /// unschedules the actor.
    pub async fn process_message(&self, msg: A::Message) {
        let mut state = self.state.lock().await;
        let current = state.clone();

        match self.actor.on_receive(msg, current).await {
            Ok((next, reply)) => {
                *state = next;
                drop(state);
                self.sink.deliver(&self.id, reply);
            }
            Err(e) => {
                drop(state);
                self.stats.handler_errors.fetch_add(1, Ordering::Relaxed);
                warn!(actor_id = %self.id, error = %e, "Handler failed, message dropped");
            }
        }

        self.stats.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .last_activity_at_ms
            .store(self.time.now_ms(), Ordering::Relaxed);
    }

    /// Clone of the current state
    pub async fn state(&self) -> A::State {
        self.state.lock().await.clone()
    }

    /// Snapshot of the executor's counters
    pub fn stats(&self) -> ExecutorStatsSnapshot {
        let last = self.stats.last_activity_at_ms.load(Ordering::Relaxed);
        ExecutorStatsSnapshot {
            messages_processed: self.stats.messages_processed.load(Ordering::Relaxed),
            handler_errors: self.stats.handler_errors.load(Ordering::Relaxed),
            episodes: self.stats.episodes.load(Ordering::Relaxed),
            last_activity_at_ms: if last == 0 { None } else { Some(last) },
        }
    }
}
