//! Priority-ordered notification dispatch with per-listener isolation.
//!
//! Synchronous listeners run inline and block `publish`; asynchronous
//! listeners run on the spawner bounded by their declared timeout. One
//! listener's failure or timeout never affects delivery to the others.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::runtime::Spawn;

use super::listener::{EventListener, ProcessingMode};
use super::record::EventRecord;

/// Decouples transition producers from notification consumers.
pub struct NotificationDispatcher<S: Spawn> {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    spawner: S,
    published: AtomicU64,
}

impl<S: Spawn> NotificationDispatcher<S> {
    /// Create a dispatcher with no registered listeners.
    pub const fn new(spawner: S) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            spawner,
            published: AtomicU64::new(0),
        }
    }

    /// Register a listener. Registration order is preserved within a
    /// priority level.
    pub fn register(&self, listener: Arc<dyn EventListener>) {
        debug!(listener = listener.name(), "listener registered");
        self.listeners.write().push(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Total events published since construction.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Deliver an event to every listener registered for its type, highest
    /// listener priority first. Returns the number of listeners that
    /// received it (or, for a cancelled event, their cancellation hook).
    pub async fn publish(&self, event: EventRecord) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut targets: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.handles(event.event_type))
            .cloned()
            .collect();
        // Stable sort keeps registration order within equal priorities.
        targets.sort_by(|a, b| b.priority().cmp(&a.priority()));

        if event.is_cancelled() {
            debug!(event = %event.event_id, "event cancelled before dispatch");
            for listener in &targets {
                listener.on_cancelled(event.clone()).await;
            }
            event.mark_processed();
            return targets.len();
        }

        if targets.is_empty() {
            event.mark_processed();
            return 0;
        }

        let pending = Arc::new(AtomicUsize::new(targets.len()));
        for listener in &targets {
            match listener.mode() {
                ProcessingMode::Synchronous => {
                    if let Err(error) = listener.on_event(event.clone()).await {
                        warn!(
                            listener = listener.name(),
                            event = %event.event_id,
                            error = %error,
                            "synchronous listener failed"
                        );
                        listener.on_error(event.clone(), error).await;
                    }
                    if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                        event.mark_processed();
                    }
                }
                ProcessingMode::Asynchronous => {
                    let listener = Arc::clone(listener);
                    let event = event.clone();
                    let pending = Arc::clone(&pending);
                    let deadline = listener.timeout();
                    self.spawner.spawn(async move {
                        match tokio::time::timeout(deadline, listener.on_event(event.clone()))
                            .await
                        {
                            Ok(Ok(())) => {}
                            Ok(Err(error)) => {
                                warn!(
                                    listener = listener.name(),
                                    event = %event.event_id,
                                    error = %error,
                                    "listener failed"
                                );
                                listener.on_error(event.clone(), error).await;
                            }
                            Err(_) => {
                                warn!(
                                    listener = listener.name(),
                                    event = %event.event_id,
                                    "listener timed out"
                                );
                                listener.on_timeout(event.clone()).await;
                            }
                        }
                        // Processed once every listener has resolved, timeout included.
                        if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                            event.mark_processed();
                        }
                    });
                }
            }
        }
        targets.len()
    }
}
