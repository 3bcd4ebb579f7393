//! Actor system facade
//!
//! TigerStyle: Single entry point, explicit configuration, clean shutdown.
//!
//! The system owns the executor registry and sits between message producers
//! and the scheduler: it creates executors on spawn, posts messages into
//! mailboxes, and enqueues an executor whenever a post may have found it
//! dormant. The scheduler only ever sees executor handles.

use crate::executor::ActorExecutor;
use crate::scheduler::Scheduler;
use minnow_core::actor::{Actor, ActorId, NoopSink, ReplySink};
use minnow_core::config::SchedulerConfig;
use minnow_core::error::{Error, Result};
use minnow_core::io::IoContext;
use minnow_core::store::StateStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Builder for an [`ActorSystem`]
pub struct ActorSystemBuilder<A: Actor> {
    config: SchedulerConfig,
    io: IoContext,
    sink: Arc<dyn ReplySink<A::Reply>>,
    store: Option<Arc<dyn StateStore>>,
}

impl<A: Actor> ActorSystemBuilder<A> {
    /// Create a builder with default configuration, production I/O, and a
    /// no-op reply sink
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            io: IoContext::production(),
            sink: Arc::new(NoopSink),
            store: None,
        }
    }

    /// Set the scheduler configuration
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the I/O providers (time, RNG)
    pub fn with_io(mut self, io: IoContext) -> Self {
        self.io = io;
        self
    }

    /// Set the reply sink
    pub fn with_sink(mut self, sink: Arc<dyn ReplySink<A::Reply>>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the persistence collaborator
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and launch the scheduler
    pub fn build(self) -> Result<ActorSystem<A>> {
        let scheduler = Scheduler::new(self.config, self.io.clone())?;
        Ok(ActorSystem {
            scheduler,
            executors: Mutex::new(HashMap::new()),
            io: self.io,
            sink: self.sink,
            store: self.store,
        })
    }
}

impl<A: Actor> Default for ActorSystemBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// The minnow actor system
///
/// Must be built inside a tokio runtime: the scheduler spawns its workers
/// on construction.
pub struct ActorSystem<A: Actor> {
    scheduler: Scheduler<A>,
    executors: Mutex<HashMap<ActorId, Arc<ActorExecutor<A>>>>,
    io: IoContext,
    sink: Arc<dyn ReplySink<A::Reply>>,
    store: Option<Arc<dyn StateStore>>,
}

impl<A: Actor> ActorSystem<A> {
    /// Start building a system
    pub fn builder() -> ActorSystemBuilder<A> {
        ActorSystemBuilder::new()
    }

    /// Register an actor under the given id
    ///
    /// Hydrates saved state from the store when one is configured. The
    /// actor stays dormant until its first message.
    pub async fn spawn(&self, id: impl Into<String>, actor: A) -> Result<ActorId> {
        let id = ActorId::new(id)?;

        let executor = Arc::new(ActorExecutor::new(
            id.clone(),
            actor,
            Arc::clone(&self.sink),
            self.store.clone(),
            Arc::clone(&self.io.time),
        ));
        executor.hydrate().await?;

        let mut executors = self.executors.lock().expect("registry lock poisoned");
        if executors.contains_key(&id) {
            return Err(Error::ActorAlreadyExists {
                id: id.as_str().to_string(),
            });
        }
        executors.insert(id.clone(), executor);
        drop(executors);

        debug!(actor_id = %id, "Actor spawned");
        Ok(id)
    }

    /// Post a message to an actor
    ///
    /// Appends to the mailbox and enqueues the executor; the enqueue is a
    /// no-op when the executor is already runnable or mid-episode, so a
    /// burst of posts schedules it exactly once.
    pub fn post(&self, id: &ActorId, msg: A::Message) -> Result<()> {
        let executor = {
            let executors = self.executors.lock().expect("registry lock poisoned");
            executors
                .get(id)
                .cloned()
                .ok_or_else(|| Error::actor_not_found(id.as_str()))?
        };

        executor.post(msg);
        self.scheduler.enqueue(executor);
        Ok(())
    }

    /// Remove an actor
    ///
    /// Deactivates the executor, drops its registry entry, and purges every
    /// queued reference. An episode already in flight finishes its current
    /// batch but is not re-enqueued. Returns whether the actor existed or
    /// any queue entry was removed.
    pub fn remove_actor(&self, id: &ActorId) -> bool {
        let executor = {
            let mut executors = self.executors.lock().expect("registry lock poisoned");
            executors.remove(id)
        };

        if let Some(executor) = &executor {
            executor.set_active(false);
        }

        let dequeued = self.scheduler.remove_actor(id);
        let existed = executor.is_some();
        if existed {
            info!(actor_id = %id, "Actor removed");
        }
        existed || dequeued
    }

    /// Handle to a registered executor
    pub fn executor(&self, id: &ActorId) -> Option<Arc<ActorExecutor<A>>> {
        self.executors
            .lock()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// Number of registered actors
    pub fn actor_count(&self) -> usize {
        self.executors.lock().expect("registry lock poisoned").len()
    }

    /// The underlying scheduler
    pub fn scheduler(&self) -> &Scheduler<A> {
        &self.scheduler
    }

    /// Stop the scheduler workers
    ///
    /// Registered actors and queued messages are left in place; no new
    /// episodes start after this returns.
    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown().await;
    }
}
