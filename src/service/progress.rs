//! Progress side channel.
//!
//! Audits report stage changes to a `ProgressSink`. Emission is
//! fire-and-forget: no acknowledgement, no backpressure, and a missing sink is
//! simply a no-op.

use tokio::sync::broadcast;

use crate::domain::models::ProgressEvent;

pub const DEFAULT_PROGRESS_CAPACITY: usize = 64;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Fan-out of progress events to any number of live subscribers.
///
/// Subscribers that fall behind lose the oldest events rather than slowing
/// the audit down.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Dropping the returned subscription unsubscribes.
    pub fn subscribe(&self) -> ProgressSubscription {
        ProgressSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_CAPACITY)
    }
}

impl ProgressSink for ProgressBroadcaster {
    fn emit(&self, event: ProgressEvent) {
        log::trace!(
            "[PROGRESS] {} {} ({}%) to {} subscribers",
            event.url,
            event.stage.as_str(),
            event.progress,
            self.tx.receiver_count()
        );
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

pub struct ProgressSubscription {
    rx: broadcast::Receiver<ProgressEvent>,
}

impl ProgressSubscription {
    /// Next event, or `None` once every broadcaster handle is gone.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("[PROGRESS] Subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next); `None` when nothing is
    /// queued right now.
    pub fn try_next(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
