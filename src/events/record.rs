//! Event records emitted on every committed enrollment transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::EnrollmentRecord;
use crate::util::clock::now_ms;

/// Kind of enrollment transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A request committed as an enrollment.
    StudentEnrolled,
    /// A request committed onto the waitlist.
    StudentWaitlisted,
    /// An enrollment or waitlist entry was dropped.
    EnrollmentDropped,
    /// A waitlisted student was promoted into a seat.
    WaitlistPromoted,
    /// A waitlisted student was skipped at promotion time.
    WaitlistSkipped,
    /// A seat was given up as part of a transfer.
    EnrollmentTransferred,
    /// An enrollment finished with a recorded grade.
    EnrollmentCompleted,
}

/// Delivery priority attached to an event or a listener (Highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum NotifyPriority {
    /// Lowest urgency.
    Low,
    /// Default urgency.
    #[default]
    Normal,
    /// Elevated urgency.
    High,
    /// Delivered before everything else.
    Highest,
}

/// A committed-transition notification flowing through the dispatcher.
///
/// Cancellation and processed flags are shared across clones, so a caller can
/// cancel an event it still holds after handing a clone to the dispatcher.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Transition kind.
    pub event_type: EventType,
    /// Projection of the affected record at commit time.
    pub payload: EnrollmentRecord,
    /// Component that produced the event.
    pub source: String,
    /// Creation timestamp in milliseconds since epoch.
    pub timestamp_ms: u128,
    /// Delivery priority.
    pub priority: NotifyPriority,
    /// Links events belonging to one logical caller action.
    pub correlation_id: Uuid,
    cancelled: Arc<AtomicBool>,
    processed: Arc<AtomicBool>,
}

impl EventRecord {
    /// Create an event for a committed transition. The correlation id is
    /// taken from the payload record.
    #[must_use]
    pub fn new(event_type: EventType, payload: EnrollmentRecord, source: impl Into<String>) -> Self {
        let correlation_id = payload.correlation_id;
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            payload,
            source: source.into(),
            timestamp_ms: now_ms(),
            priority: NotifyPriority::default(),
            correlation_id,
            cancelled: Arc::new(AtomicBool::new(false)),
            processed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the delivery priority.
    #[must_use]
    pub fn with_priority(mut self, priority: NotifyPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Cancel the event. If dispatch has not started, listeners receive their
    /// cancellation hook instead of the event.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the event has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn mark_processed(&self) {
        self.processed.store(true, Ordering::Release);
    }

    /// Whether every listener has completed, errored, timed out, or observed
    /// the cancellation.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseId, EnrollmentRecord, Semester, StudentId, Term};

    fn record() -> EnrollmentRecord {
        EnrollmentRecord::new(
            StudentId::from("S-1"),
            CourseId::from("CS101"),
            Term::new(Semester::Fall, 2025),
            3,
            Uuid::new_v4(),
            1_000,
        )
    }

    #[test]
    fn test_flags_shared_across_clones() {
        let event = EventRecord::new(EventType::StudentEnrolled, record(), "test");
        let clone = event.clone();
        clone.cancel();
        assert!(event.is_cancelled());
        assert!(!event.is_processed());
    }

    #[test]
    fn test_correlation_comes_from_payload() {
        let rec = record();
        let correlation = rec.correlation_id;
        let event = EventRecord::new(EventType::StudentWaitlisted, rec, "test");
        assert_eq!(event.correlation_id, correlation);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(NotifyPriority::Highest > NotifyPriority::High);
        assert!(NotifyPriority::High > NotifyPriority::Normal);
        assert!(NotifyPriority::Normal > NotifyPriority::Low);
    }
}
