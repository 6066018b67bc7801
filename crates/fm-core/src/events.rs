//! Batch event envelope and broadcast bus.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel so that any
//! number of consumers (a terminal renderer, a JSON stream, an embedding
//! application) can follow a batch without the dispatcher knowing about
//! them. Sends are lossy when nobody is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::outcome::TaskOutcome;

/// Payload describing what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEventPayload {
    /// One input finished, successfully or not.
    TaskFinished {
        /// The finished task's outcome.
        outcome: TaskOutcome,
    },
    /// Every input in the batch has finished.
    BatchFinished {
        /// Failing inputs in completion order; empty when all
        /// conversions succeeded.
        failed: Vec<PathBuf>,
    },
}

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: BatchEventPayload,
}

impl BatchEvent {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: BatchEventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Broadcast channel for streaming batch events to subscribers.
pub struct EventBus {
    tx: broadcast::Sender<BatchEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers.
    pub fn broadcast(&self, payload: BatchEventPayload) {
        // Ignore send errors (no subscribers).
        let _ = self.tx.send(BatchEvent::new(payload));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
