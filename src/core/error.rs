//! Typed error taxonomy for enrollment operations.

use thiserror::Error;

use crate::domain::EnrollmentStatus;

/// Broad classification of an [`EnrollmentError`], driving retry policy and
/// caller remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient capacity or timing condition; may resolve later.
    CapacityTiming,
    /// The student is not eligible; retrying without changed inputs is futile.
    Eligibility,
    /// The student's account needs external remediation first.
    AccountState,
    /// Programming or race-guard violation; never retried.
    Integrity,
    /// Underlying store or cache failure; retried a bounded number of times.
    System,
}

/// Errors produced by enrollment operations.
///
/// Every rejection carries enough context for the caller to construct a
/// remediation suggestion; no request is silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    /// An active (non-terminal) record already exists for the pair.
    #[error("student already has an active enrollment in {course}")]
    DuplicateEnrollment {
        /// Course of the existing active record.
        course: String,
    },
    /// The course meets at the same time as one the student already has.
    #[error("course conflicts with {conflicting_course} in the student's schedule")]
    ScheduleConflict {
        /// Course already on the schedule that collides.
        conflicting_course: String,
    },
    /// A required prerequisite course has not been completed.
    #[error("prerequisite {prerequisite} not met")]
    PrerequisiteNotMet {
        /// Missing prerequisite course.
        prerequisite: String,
    },
    /// Enrolling would push the student past the term credit limit.
    #[error("enrollment would exceed the credit limit of {limit_credits}")]
    CreditLimitExceeded {
        /// Maximum credits permitted for the term.
        limit_credits: u32,
    },
    /// A financial or academic hold blocks registration changes.
    #[error("{hold_type} hold on account")]
    HoldOnAccount {
        /// Kind of hold (e.g. `financial`, `academic`).
        hold_type: String,
        /// Outstanding balance in cents, when the hold is financial.
        amount_due_cents: Option<u64>,
    },
    /// The enrollment window for the term is not open.
    #[error("enrollment period is closed")]
    EnrollmentClosed,
    /// The add/drop deadline has passed.
    #[error("enrollment deadline has passed")]
    DeadlinePassed,
    /// Both the course and its waitlist are at capacity.
    #[error("waitlist is full")]
    WaitlistFull,
    /// The student's grade level is excluded from this course.
    #[error("grade-level restriction: {restriction}")]
    GradeLevelRestriction {
        /// Restriction that applies.
        restriction: String,
    },
    /// Students on academic probation may not enroll in this course.
    #[error("student is on academic probation")]
    AcademicProbation,
    /// An outstanding balance must be paid before enrolling.
    #[error("payment of {amount_due_cents} cents required before enrolling")]
    PaymentRequired {
        /// Outstanding balance in cents.
        amount_due_cents: u64,
    },
    /// The student's standing does not permit enrollment at all.
    #[error("student status does not permit enrollment: {status}")]
    InvalidStudentStatus {
        /// Standing reported by the records system.
        status: String,
    },
    /// The student identifier did not resolve.
    #[error("student {0} not found")]
    StudentNotFound(String),
    /// The course identifier did not resolve.
    #[error("course {0} not found")]
    CourseNotFound(String),
    /// No enrollment record exists for the student/course pair.
    #[error("no enrollment on file for this student/course pair")]
    EnrollmentNotFound,
    /// The requested move is not on the status transition graph.
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Status the record currently holds.
        from: EnrollmentStatus,
        /// Status the caller attempted to reach.
        to: EnrollmentStatus,
    },
    /// A batch was cancelled before this request was dispatched.
    #[error("batch cancelled before this request was dispatched")]
    BatchCancelled,
    /// The underlying store or cache is unavailable.
    #[error("enrollment store unavailable: {0}")]
    Store(String),
}

impl EnrollmentError {
    /// Taxonomy classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::WaitlistFull | Self::EnrollmentClosed | Self::DeadlinePassed | Self::BatchCancelled => {
                ErrorKind::CapacityTiming
            }
            Self::ScheduleConflict { .. }
            | Self::PrerequisiteNotMet { .. }
            | Self::CreditLimitExceeded { .. }
            | Self::GradeLevelRestriction { .. }
            | Self::AcademicProbation => ErrorKind::Eligibility,
            Self::HoldOnAccount { .. }
            | Self::PaymentRequired { .. }
            | Self::InvalidStudentStatus { .. } => ErrorKind::AccountState,
            Self::DuplicateEnrollment { .. }
            | Self::StudentNotFound(_)
            | Self::CourseNotFound(_)
            | Self::EnrollmentNotFound
            | Self::InvalidStatusTransition { .. } => ErrorKind::Integrity,
            Self::Store(_) => ErrorKind::System,
        }
    }

    /// Whether the coordinator may retry the failed operation automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::System)
    }

    /// Human-readable remediation suggestion for the caller.
    #[must_use]
    pub const fn remediation(&self) -> &'static str {
        match self.kind() {
            ErrorKind::CapacityTiming => "try again later or pick another section",
            ErrorKind::Eligibility => "adjust the requested course or schedule",
            ErrorKind::AccountState => "contact the registrar or bursar to clear the account",
            ErrorKind::Integrity => "verify the student/course pair and current enrollment state",
            ErrorKind::System => "the request was not processed; retry shortly",
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(EnrollmentError::WaitlistFull.kind(), ErrorKind::CapacityTiming);
        assert_eq!(
            EnrollmentError::PrerequisiteNotMet {
                prerequisite: "CS100".into()
            }
            .kind(),
            ErrorKind::Eligibility
        );
        assert_eq!(
            EnrollmentError::HoldOnAccount {
                hold_type: "financial".into(),
                amount_due_cents: Some(12_500),
            }
            .kind(),
            ErrorKind::AccountState
        );
        assert_eq!(
            EnrollmentError::DuplicateEnrollment {
                course: "CS101".into()
            }
            .kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            EnrollmentError::Store("connection refused".into()).kind(),
            ErrorKind::System
        );
    }

    #[test]
    fn test_only_system_errors_retry() {
        assert!(EnrollmentError::Store("timeout".into()).is_retryable());
        assert!(!EnrollmentError::WaitlistFull.is_retryable());
        assert!(!EnrollmentError::EnrollmentNotFound.is_retryable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = EnrollmentError::ScheduleConflict {
            conflicting_course: "MATH201".into(),
        };
        assert!(err.to_string().contains("MATH201"));

        let err = EnrollmentError::PaymentRequired {
            amount_due_cents: 4_200,
        };
        assert!(err.to_string().contains("4200"));
    }

    #[test]
    fn test_remediation_is_present() {
        assert!(!EnrollmentError::WaitlistFull.remediation().is_empty());
        assert!(!EnrollmentError::AcademicProbation.remediation().is_empty());
    }
}
