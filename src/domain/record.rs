//! Enrollment records and the status transition graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::EnrollmentError;

use super::{CourseId, StudentId, Term};

/// Lifecycle status of an enrollment record.
///
/// Transitions form a DAG: `Requested` resolves to `Enrolled` or `Waitlisted`,
/// `Waitlisted` to `Enrolled` or `Dropped`, `Enrolled` to `Dropped`,
/// `Completed`, or `Transferred`. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Request accepted for processing, not yet decided.
    Requested,
    /// Student holds a seat in the course.
    Enrolled,
    /// Student is queued for the next free seat.
    Waitlisted,
    /// Enrollment ended by the student or the registrar.
    Dropped,
    /// Course finished with a recorded grade.
    Completed,
    /// Seat given up in favor of another course.
    Transferred,
}

impl EnrollmentStatus {
    /// Whether this status ends the record's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dropped | Self::Completed | Self::Transferred)
    }

    /// Whether the transition graph permits moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Enrolled | Self::Waitlisted)
                | (Self::Waitlisted, Self::Enrolled | Self::Dropped)
                | (
                    Self::Enrolled,
                    Self::Dropped | Self::Completed | Self::Transferred
                )
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requested => "requested",
            Self::Enrolled => "enrolled",
            Self::Waitlisted => "waitlisted",
            Self::Dropped => "dropped",
            Self::Completed => "completed",
            Self::Transferred => "transferred",
        };
        f.write_str(name)
    }
}

/// One student's enrollment in one course offering.
///
/// Identity is the `(student, course)` pair; at most one non-terminal record
/// exists per pair at any time (enforced by the store's atomic create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    /// Student side of the identity pair.
    pub student: StudentId,
    /// Course side of the identity pair.
    pub course: CourseId,
    /// Current lifecycle status.
    pub status: EnrollmentStatus,
    /// Offering this enrollment belongs to.
    pub term: Term,
    /// When the request was accepted (ms since epoch).
    pub requested_at_ms: u128,
    /// When the most recent transition was committed (ms since epoch).
    pub decided_at_ms: Option<u128>,
    /// 1-based waitlist position; only meaningful while `Waitlisted`.
    pub waitlist_position: Option<u32>,
    /// Credit hours the course carries.
    pub credits: u32,
    /// Earned grade in milli-grade-points (4000 = 4.0); set on completion.
    pub grade_millis: Option<u32>,
    /// Links the events and audit entries of one logical caller action.
    pub correlation_id: Uuid,
}

impl EnrollmentRecord {
    /// Create a fresh record in `Requested` status.
    #[must_use]
    pub const fn new(
        student: StudentId,
        course: CourseId,
        term: Term,
        credits: u32,
        correlation_id: Uuid,
        now_ms: u128,
    ) -> Self {
        Self {
            student,
            course,
            status: EnrollmentStatus::Requested,
            term,
            requested_at_ms: now_ms,
            decided_at_ms: None,
            waitlist_position: None,
            credits,
            grade_millis: None,
            correlation_id,
        }
    }

    /// Apply a status transition, rejecting any move the DAG forbids.
    ///
    /// # Errors
    ///
    /// `InvalidStatusTransition` when `next` is not reachable from the current
    /// status, including any move out of a terminal state.
    pub fn transition(
        &mut self,
        next: EnrollmentStatus,
        now_ms: u128,
    ) -> Result<(), EnrollmentError> {
        if !self.status.can_transition_to(next) {
            return Err(EnrollmentError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.decided_at_ms = Some(now_ms);
        if next != EnrollmentStatus::Waitlisted {
            self.waitlist_position = None;
        }
        Ok(())
    }
}
