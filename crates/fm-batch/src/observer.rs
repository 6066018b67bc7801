//! The notification boundary between the dispatcher and its caller.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use fm_core::events::{BatchEventPayload, EventBus};
use fm_core::TaskOutcome;

/// Receives batch progress notifications.
///
/// `on_task_done` is invoked from the dispatcher's control loop after a
/// task finishes and before its concurrency slot is reused, so
/// implementations should return promptly; anything slow belongs behind
/// a channel (see [`EventObserver`]).
#[async_trait]
pub trait BatchObserver: Send + Sync {
    /// One input finished, successfully or not. At most once per
    /// distinct input, interleaved arbitrarily with the admission of
    /// new tasks.
    async fn on_task_done(&self, outcome: &TaskOutcome);

    /// Every input has finished. Exactly once per batch, after the
    /// last `on_task_done`; `failed` lists failing inputs in
    /// completion order.
    async fn on_batch_done(&self, failed: &[PathBuf]);
}

/// Observer that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl BatchObserver for NoopObserver {
    async fn on_task_done(&self, _outcome: &TaskOutcome) {}
    async fn on_batch_done(&self, _failed: &[PathBuf]) {}
}

/// Forwards notifications onto an [`EventBus`] as lossy broadcasts, so
/// consumers follow the batch from a channel instead of blocking the
/// dispatcher.
pub struct EventObserver {
    bus: Arc<EventBus>,
}

impl EventObserver {
    /// Create an observer publishing to the given bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl BatchObserver for EventObserver {
    async fn on_task_done(&self, outcome: &TaskOutcome) {
        self.bus.broadcast(BatchEventPayload::TaskFinished {
            outcome: outcome.clone(),
        });
    }

    async fn on_batch_done(&self, failed: &[PathBuf]) {
        self.bus.broadcast(BatchEventPayload::BatchFinished {
            failed: failed.to_vec(),
        });
    }
}
