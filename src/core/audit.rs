//! Append-only audit trail of enrollment state transitions.
//!
//! The recorder never initiates enrollment logic; it only receives entries
//! from the coordinator. Entries are immutable once written.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::AppResult;
use crate::domain::{CourseId, StudentId};
use crate::util::clock::now_ms;

/// Action recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Request committed as an enrollment.
    Enrolled,
    /// Request committed onto the waitlist.
    Waitlisted,
    /// Enrollment or waitlist entry dropped.
    Dropped,
    /// Enrollment completed with a grade.
    Completed,
    /// Seat given up as part of a transfer.
    Transferred,
    /// Waitlist entry promoted into a seat.
    Promoted,
    /// Waitlist entry skipped because preconditions no longer hold.
    PromotionSkipped,
    /// Request rejected by a precondition or capacity check.
    Rejected,
}

/// Identity responsible for an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    /// The engine itself (e.g. waitlist promotion).
    System,
    /// A named user of the records system.
    User(String),
}

/// Immutable record of one committed transition or rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub entry_id: Uuid,
    /// Student side of the affected pair.
    pub student: StudentId,
    /// Course side of the affected pair.
    pub course: CourseId,
    /// Who performed the action.
    pub actor: Actor,
    /// Action taken.
    pub action: AuditAction,
    /// Links entries belonging to one logical caller action.
    pub correlation_id: Uuid,
    /// Timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Additional context (reason, oracle name, error text).
    pub detail: Option<String>,
}

/// Sink receiving audit entries. Implementations are append-only; nothing may
/// mutate or delete an entry after `record` returns.
pub trait AuditSink: Send + Sync {
    /// Record one entry.
    fn record(&self, entry: AuditEntry);
}

/// Bounded in-memory audit sink with query support, for development and
/// testing. Oldest entries are evicted when the buffer is full.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
    max_entries: usize,
}

impl InMemoryAuditSink {
    /// Create a sink retaining at most `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries.min(1024)))),
            max_entries,
        }
    }

    /// Snapshot of all retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries affecting one student/course pair.
    #[must_use]
    pub fn by_entity(&self, student: &StudentId, course: &CourseId) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| &e.student == student && &e.course == course)
            .cloned()
            .collect()
    }

    /// Entries recorded by one actor.
    #[must_use]
    pub fn by_actor(&self, actor: &Actor) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| &e.actor == actor)
            .cloned()
            .collect()
    }

    /// Entries within `[from_ms, to_ms)`.
    #[must_use]
    pub fn by_range(&self, from_ms: u128, to_ms: u128) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.created_at_ms >= from_ms && e.created_at_ms < to_ms)
            .cloned()
            .collect()
    }

    /// Entries recording one action type.
    #[must_use]
    pub fn by_action(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    /// Entries sharing one correlation id, i.e. one logical caller action.
    #[must_use]
    pub fn by_correlation(&self, correlation_id: Uuid) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect()
    }

    /// Export all retained entries as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Serialization failures, which should not occur for well-formed entries.
    pub fn export_json(&self) -> AppResult<String> {
        let entries = self.entries();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// Helper to build an audit entry from context.
#[must_use]
pub fn build_audit_entry(
    student: StudentId,
    course: CourseId,
    actor: Actor,
    action: AuditAction,
    correlation_id: Uuid,
    detail: Option<String>,
) -> AuditEntry {
    AuditEntry {
        entry_id: Uuid::new_v4(),
        student,
        course,
        actor,
        action,
        correlation_id,
        created_at_ms: now_ms(),
        detail,
    }
}
