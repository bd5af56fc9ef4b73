//! Listener contract for the notification dispatcher.

use std::time::Duration;

use async_trait::async_trait;

use super::record::{EventRecord, EventType, NotifyPriority};

/// Default bound on asynchronous listener execution.
pub const DEFAULT_LISTENER_TIMEOUT: Duration = Duration::from_secs(30);

/// How a listener is invoked relative to `publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Runs inline; `publish` waits for it.
    Synchronous,
    /// Runs on the spawner; `publish` does not wait.
    #[default]
    Asynchronous,
}

/// A consumer of enrollment events.
///
/// Only `name`, `event_types`, and `on_event` need implementing; priority,
/// mode, timeout, and the error/timeout/cancellation hooks have default
/// behavior. An empty `event_types` list subscribes to every type.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Listener name used in logs.
    fn name(&self) -> &str;

    /// Event types this listener consumes; empty means all.
    fn event_types(&self) -> Vec<EventType>;

    /// Invocation order among listeners for one event (Highest first).
    fn priority(&self) -> NotifyPriority {
        NotifyPriority::Normal
    }

    /// Whether the listener runs inline or on the spawner.
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::default()
    }

    /// Bound on asynchronous execution; the timeout hook fires past it.
    fn timeout(&self) -> Duration {
        DEFAULT_LISTENER_TIMEOUT
    }

    /// Whether this listener wants the given event type.
    fn handles(&self, event_type: EventType) -> bool {
        let types = self.event_types();
        types.is_empty() || types.contains(&event_type)
    }

    /// Consume one event.
    ///
    /// # Errors
    ///
    /// Any error is routed to `on_error` and never affects other listeners.
    async fn on_event(&self, event: EventRecord) -> anyhow::Result<()>;

    /// Called when `on_event` returned an error.
    async fn on_error(&self, _event: EventRecord, _error: anyhow::Error) {}

    /// Called when an asynchronous invocation exceeded its timeout.
    async fn on_timeout(&self, _event: EventRecord) {}

    /// Called instead of `on_event` when the event was cancelled before
    /// dispatch.
    async fn on_cancelled(&self, _event: EventRecord) {}
}
