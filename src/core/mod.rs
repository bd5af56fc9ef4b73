//! Core engine: capacity accounting, enrollment coordination, waitlists,
//! grade aggregation, batching, and the audit trail.

pub mod audit;
pub mod batch;
pub mod capacity;
pub mod coordinator;
pub mod error;
pub mod grades;
pub mod waitlist;

pub use audit::{build_audit_entry, Actor, AuditAction, AuditEntry, AuditSink, InMemoryAuditSink};
pub use batch::{BatchCancellation, BatchOutcome, BatchProcessor};
pub use capacity::{CapacityCache, CapacityProvider, CourseCapacitySnapshot, CourseLimits};
pub use coordinator::{
    DirectoryService, EnrollmentCoordinator, EnrollmentStore, PreconditionOracle, RetryPolicy,
    SnapshotFilter,
};
pub use error::{AppResult, EnrollmentError, ErrorKind};
pub use grades::{GradeAggregator, GradeDistribution, GradeStatistics, PASS_THRESHOLD_MILLIS};
pub use waitlist::{WaitlistEntry, WaitlistManager};
