//! Actor abstractions for minnow
//!
//! TigerStyle: Explicit types, assertions, bounded operations.

use crate::constants::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

// =============================================================================
// ActorId
// =============================================================================

/// Unique identifier for an actor
///
/// Actor IDs are opaque strings. The scheduler uses them only for equality
/// comparisons (queue removal, registry lookup) and never interprets their
/// contents.
///
/// # TigerStyle
/// - Explicit validation on construction
/// - Immutable after creation
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Create a new ActorId with validation
    ///
    /// # Errors
    /// Returns error if the id is empty, exceeds the length limit, or
    /// contains invalid characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidActorId {
                id,
                reason: "id must not be empty".into(),
            });
        }

        if id.len() > ACTOR_ID_LENGTH_BYTES_MAX {
            return Err(Error::ActorIdTooLong {
                length: id.len(),
                limit: ACTOR_ID_LENGTH_BYTES_MAX,
            });
        }

        // Validate characters (alphanumeric, dash, underscore, dot)
        let valid = id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.');

        if !valid {
            return Err(Error::InvalidActorId {
                id,
                reason: "id contains invalid characters".into(),
            });
        }

        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Actor Trait
// =============================================================================

/// Actor trait - implement to create actors
///
/// An actor owns private state and receives messages one at a time. Each
/// receipt produces a new state and a reply. The scheduler guarantees that
/// at most one `on_receive` is in flight per actor at any moment.
///
/// # TigerStyle
/// - Single-threaded execution guarantee (no concurrent invocations)
/// - State is serializable for the optional persistence collaborator
#[async_trait]
pub trait Actor: Send + Sync + 'static {
    /// The actor's state type
    ///
    /// `Clone` lets the runtime retain the previous state when a handler
    /// fails; the serde bounds serve the persistence collaborator. The
    /// scheduler itself never inspects state.
    type State: Serialize + DeserializeOwned + Default + Clone + Send + Sync;

    /// The message type this actor receives
    type Message: Send + 'static;

    /// The reply type this actor emits
    type Reply: Send + 'static;

    /// Handle one message
    ///
    /// Takes the current state by value and returns the next state plus a
    /// reply. A returned error drops the message and keeps the previous
    /// state; it never unschedules the actor.
    async fn on_receive(
        &self,
        msg: Self::Message,
        state: Self::State,
    ) -> Result<(Self::State, Self::Reply)>;
}

// =============================================================================
// Reply Sink
// =============================================================================

/// Destination for actor replies
///
/// The runtime hands each reply to the sink out of band. Delivery is
/// infallible from the scheduler's perspective and must be cheap - a sink
/// that needs to do real work should hand off to its own task.
pub trait ReplySink<R>: Send + Sync {
    /// Deliver one reply produced by the given actor
    fn deliver(&self, id: &ActorId, reply: R);
}

/// Sink that discards all replies
///
/// Useful for fire-and-forget actors and for testing paths where replies
/// are irrelevant.
#[derive(Debug, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Create a new no-op sink
    pub fn new() -> Self {
        Self
    }
}

impl<R> ReplySink<R> for NoopSink {
    fn deliver(&self, _id: &ActorId, _reply: R) {}
}

/// Sink that forwards replies over an unbounded channel
///
/// The receiving half is returned alongside the sink so embedders and tests
/// can observe outputs without a transport.
pub struct ChannelSink<R> {
    tx: mpsc::UnboundedSender<(ActorId, R)>,
}

impl<R: Send + 'static> ChannelSink<R> {
    /// Create a sink and the receiver it feeds
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ActorId, R)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<R: Send> ReplySink<R> for ChannelSink<R> {
    fn deliver(&self, id: &ActorId, reply: R) {
        // A dropped receiver means nobody is listening; the reply is
        // discarded, matching NoopSink semantics.
        let _ = self.tx.send((id.clone(), reply));
    }
}
