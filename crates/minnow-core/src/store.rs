//! Persistence collaborator for actor state
//!
//! TigerStyle: Explicit operations, bounded sizes.
//!
//! The runtime serializes actor state to bytes before handing it to a
//! store, so implementations are oblivious to the state type. The scheduler
//! never calls a store directly; only the executor does, around suspension
//! and hydration.

use crate::actor::ActorId;
use crate::constants::ACTOR_STATE_SIZE_BYTES_MAX;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// Store for serialized actor state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the saved state for an actor
    ///
    /// Returns None if the actor has no saved state.
    async fn load(&self, id: &ActorId) -> Result<Option<Bytes>>;

    /// Save the state for an actor
    ///
    /// Overwrites any previously saved state.
    async fn save(&self, id: &ActorId, state: Bytes) -> Result<()>;

    /// Delete the saved state for an actor
    ///
    /// No-op if the actor has no saved state.
    async fn delete(&self, id: &ActorId) -> Result<()>;
}

/// In-memory state store
///
/// Keeps every actor's serialized state in a process-local map. Intended
/// for tests and single-process embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actors with saved state
    pub fn len(&self) -> usize {
        self.entries.lock().expect("store lock poisoned").len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, id: &ActorId) -> Result<Option<Bytes>> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(id.as_str()).cloned())
    }

    async fn save(&self, id: &ActorId, state: Bytes) -> Result<()> {
        debug_assert!(
            state.len() <= ACTOR_STATE_SIZE_BYTES_MAX,
            "state exceeds maximum size"
        );
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(id.as_str().to_string(), state);
        Ok(())
    }

    async fn delete(&self, id: &ActorId) -> Result<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.remove(id.as_str());
        Ok(())
    }
}
