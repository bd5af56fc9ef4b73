//! Bounded-concurrency bulk operations over the coordinator.
//!
//! A batch fans its inputs out as spawned tasks gated by a semaphore, so at
//! most `concurrency` requests run at once regardless of batch size. Every
//! input is accounted for exactly once in the outcome, including inputs
//! skipped by cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::audit::Actor;
use crate::core::coordinator::EnrollmentCoordinator;
use crate::core::error::EnrollmentError;
use crate::domain::{CourseId, EnrollmentStatus, StudentId, Term};
use crate::runtime::Spawn;

/// Cooperative cancellation token shared between a batch and its caller.
/// In-flight requests run to completion; not-yet-dispatched inputs are
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct BatchCancellation {
    flag: Arc<AtomicBool>,
}

impl BatchCancellation {
    /// Fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated batch.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Per-input accounting for a completed batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Students enrolled directly.
    pub succeeded: Vec<StudentId>,
    /// Students placed on a waitlist.
    pub waitlisted: Vec<StudentId>,
    /// Students whose request failed, with the typed reason. Cancelled
    /// inputs appear here with [`EnrollmentError::BatchCancelled`].
    pub failed: Vec<(StudentId, EnrollmentError)>,
}

impl BatchOutcome {
    /// Total inputs accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.waitlisted.len() + self.failed.len()
    }
}

/// Runs bulk enrollment and drop operations with bounded concurrency.
pub struct BatchProcessor<S: Spawn> {
    coordinator: Arc<EnrollmentCoordinator<S>>,
    concurrency: usize,
}

impl<S: Spawn> BatchProcessor<S> {
    /// Create a processor allowing at most `concurrency` in-flight requests
    /// per batch. A value of zero is clamped to one.
    #[must_use]
    pub fn new(coordinator: Arc<EnrollmentCoordinator<S>>, concurrency: usize) -> Self {
        Self {
            coordinator,
            concurrency: concurrency.max(1),
        }
    }

    /// Enroll every `(student, course)` pair, at most `concurrency` at a
    /// time. Partial failure is expected; each input lands in exactly one
    /// outcome bucket.
    pub async fn bulk_enroll(
        &self,
        requests: Vec<(StudentId, CourseId)>,
        term: Term,
        actor: Actor,
        cancellation: &BatchCancellation,
    ) -> BatchOutcome {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);
        let mut outcome = BatchOutcome::default();

        for (student, course) in requests {
            if cancellation.is_cancelled() {
                outcome
                    .failed
                    .push((student, EnrollmentError::BatchCancelled));
                continue;
            }
            // Acquire before spawning so dispatch itself is bounded.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                outcome.failed.push((student, EnrollmentError::Store(
                    "batch semaphore closed".to_string(),
                )));
                continue;
            };
            let coordinator = Arc::clone(&self.coordinator);
            let actor = actor.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = coordinator
                    .request_enrollment(student.clone(), course, term, actor)
                    .await;
                (student, result)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((student, Ok(record))) => match record.status {
                    EnrollmentStatus::Waitlisted => outcome.waitlisted.push(student),
                    _ => outcome.succeeded.push(student),
                },
                Ok((student, Err(e))) => outcome.failed.push((student, e)),
                Err(join_error) => {
                    // The input is unrecoverable here; surface the panic as a
                    // system failure rather than losing the slot silently.
                    warn!(error = %join_error, "batch task failed to join");
                    outcome.failed.push((
                        StudentId::from("unknown"),
                        EnrollmentError::Store(join_error.to_string()),
                    ));
                }
            }
        }

        info!(
            total,
            succeeded = outcome.succeeded.len(),
            waitlisted = outcome.waitlisted.len(),
            failed = outcome.failed.len(),
            "bulk enroll finished"
        );
        outcome
    }

    /// Drop every `(student, course)` pair, at most `concurrency` at a time.
    /// Successful drops land in `succeeded`; `waitlisted` stays empty.
    pub async fn bulk_drop(
        &self,
        requests: Vec<(StudentId, CourseId)>,
        reason: &str,
        actor: Actor,
        cancellation: &BatchCancellation,
    ) -> BatchOutcome {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);
        let mut outcome = BatchOutcome::default();

        for (student, course) in requests {
            if cancellation.is_cancelled() {
                outcome
                    .failed
                    .push((student, EnrollmentError::BatchCancelled));
                continue;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                outcome.failed.push((student, EnrollmentError::Store(
                    "batch semaphore closed".to_string(),
                )));
                continue;
            };
            let coordinator = Arc::clone(&self.coordinator);
            let actor = actor.clone();
            let reason = reason.to_string();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = coordinator
                    .drop_enrollment(student.clone(), course, &reason, actor)
                    .await;
                (student, result)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((student, Ok(_))) => outcome.succeeded.push(student),
                Ok((student, Err(e))) => outcome.failed.push((student, e)),
                Err(join_error) => {
                    warn!(error = %join_error, "batch task failed to join");
                    outcome.failed.push((
                        StudentId::from("unknown"),
                        EnrollmentError::Store(join_error.to_string()),
                    ));
                }
            }
        }

        info!(
            total,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk drop finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_across_clones() {
        let token = BatchCancellation::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn outcome_total_sums_buckets() {
        let mut outcome = BatchOutcome::default();
        outcome.succeeded.push(StudentId::from("s1"));
        outcome.waitlisted.push(StudentId::from("s2"));
        outcome
            .failed
            .push((StudentId::from("s3"), EnrollmentError::BatchCancelled));
        assert_eq!(outcome.total(), 3);
    }
}
