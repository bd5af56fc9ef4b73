//! Asynchronous, priority-ordered event notification pipeline.

pub mod bus;
pub mod listener;
pub mod record;

pub use bus::NotificationDispatcher;
pub use listener::{EventListener, ProcessingMode, DEFAULT_LISTENER_TIMEOUT};
pub use record::{EventRecord, EventType, NotifyPriority};
