//! The per-course serialization point for enrollment decisions.
//!
//! The coordinator validates a request against external collaborators,
//! claims capacity through the cache's atomic primitive, commits the
//! authoritative mutation, and then drives waitlist promotion, event
//! emission, and audit recording. Precondition checks happen before any
//! capacity reservation so no external I/O runs while a seat is held
//! speculatively.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::audit::{build_audit_entry, Actor, AuditAction, AuditSink};
use crate::core::capacity::{CapacityCache, CourseCapacitySnapshot};
use crate::core::error::EnrollmentError;
use crate::core::waitlist::WaitlistManager;
use crate::domain::{
    CourseId, EnrollmentRecord, EnrollmentStatus, StudentId, Term, WaitlistPriority,
};
use crate::events::{EventRecord, EventType, NotificationDispatcher};
use crate::runtime::Spawn;
use crate::util::clock::now_ms;

/// Source tag stamped on events the coordinator emits.
const EVENT_SOURCE: &str = "enrollment-coordinator";

/// Persistence seam for enrollment records, keyed by `(student, course)`.
pub trait EnrollmentStore: Send + Sync {
    /// Insert a new record atomically, failing with `DuplicateEnrollment` if
    /// an active (non-terminal) record already exists for the pair.
    ///
    /// # Errors
    ///
    /// `DuplicateEnrollment` on an active collision; `Store` on backend
    /// failure.
    fn create(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError>;

    /// Persist the new state of the pair's most recent record.
    ///
    /// # Errors
    ///
    /// `EnrollmentNotFound` when no record exists; `Store` on backend failure.
    fn update(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError>;

    /// Most recent record for the pair, terminal or not.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn find(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError>;

    /// Active (non-terminal) record for the pair, if any.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn find_active(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError>;

    /// Existence check for an active record, without loading it.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn has_active(&self, student: &StudentId, course: &CourseId) -> Result<bool, EnrollmentError>;

    /// Point-in-time snapshot of `Completed` records matching the filter,
    /// taken as one consistent read.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn completed_snapshot(
        &self,
        filter: &SnapshotFilter,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError>;
}

/// Filter narrowing a completed-enrollment snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilter {
    /// Restrict to one course.
    pub course: Option<CourseId>,
    /// Restrict to one student.
    pub student: Option<StudentId>,
    /// Restrict to one term.
    pub term: Option<Term>,
}

/// Student/course existence lookup against the records system.
pub trait DirectoryService: Send + Sync {
    /// Whether the student id resolves.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn student_exists(&self, student: &StudentId) -> Result<bool, EnrollmentError>;

    /// Whether the course id resolves.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    fn course_exists(&self, course: &CourseId) -> Result<bool, EnrollmentError>;
}

/// A named precondition consulted before any capacity reservation: schedule
/// conflicts, prerequisites, credit limits, holds, the enrollment calendar.
pub trait PreconditionOracle: Send + Sync {
    /// Name used in logs and audit detail.
    fn name(&self) -> &str;

    /// Ok when the student may enroll; the typed reason otherwise.
    ///
    /// # Errors
    ///
    /// The eligibility, account-state, or timing error blocking enrollment.
    fn check(
        &self,
        student: &StudentId,
        course: &CourseId,
        term: Term,
    ) -> Result<(), EnrollmentError>;
}

/// Bounded retry policy applied to transient (`System`) store failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Base backoff; attempt `n` waits `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Coordinates enrollment, drop, transfer, and completion transitions.
pub struct EnrollmentCoordinator<S: Spawn> {
    store: Arc<dyn EnrollmentStore>,
    directory: Arc<dyn DirectoryService>,
    oracles: Vec<Arc<dyn PreconditionOracle>>,
    capacity: Arc<CapacityCache>,
    waitlist: Arc<WaitlistManager>,
    audit: Arc<dyn AuditSink>,
    dispatcher: Arc<NotificationDispatcher<S>>,
    retry: RetryPolicy,
}

impl<S: Spawn> EnrollmentCoordinator<S> {
    /// Wire a coordinator from its collaborators. Lifecycle of every handle
    /// is owned by the composition root, not by the coordinator.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        directory: Arc<dyn DirectoryService>,
        oracles: Vec<Arc<dyn PreconditionOracle>>,
        capacity: Arc<CapacityCache>,
        waitlist: Arc<WaitlistManager>,
        audit: Arc<dyn AuditSink>,
        dispatcher: Arc<NotificationDispatcher<S>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            oracles,
            capacity,
            waitlist,
            audit,
            dispatcher,
            retry,
        }
    }

    /// Request enrollment of a student into a course offering.
    ///
    /// Losers of a capacity race are waitlisted, not rejected; only an
    /// exhausted waitlist yields `WaitlistFull`.
    ///
    /// # Errors
    ///
    /// Typed precondition, account-state, integrity, or system errors per the
    /// taxonomy in [`EnrollmentError`].
    pub async fn request_enrollment(
        &self,
        student: StudentId,
        course: CourseId,
        term: Term,
        actor: Actor,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.request_with_correlation(
            student,
            course,
            term,
            actor,
            Uuid::new_v4(),
            WaitlistPriority::Normal,
        )
        .await
    }

    /// `request_enrollment` with an explicit correlation id and waitlist
    /// priority, used by transfers and compensation.
    pub(crate) async fn request_with_correlation(
        &self,
        student: StudentId,
        course: CourseId,
        term: Term,
        actor: Actor,
        correlation_id: Uuid,
        priority: WaitlistPriority,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        if !self.directory.student_exists(&student)? {
            return Err(EnrollmentError::StudentNotFound(student.to_string()));
        }
        if !self.directory.course_exists(&course)? {
            return Err(EnrollmentError::CourseNotFound(course.to_string()));
        }
        if self.store.has_active(&student, &course)? {
            return Err(EnrollmentError::DuplicateEnrollment {
                course: course.to_string(),
            });
        }
        if let Err(reason) = self.check_preconditions(&student, &course, term) {
            self.audit.record(build_audit_entry(
                student,
                course,
                actor,
                AuditAction::Rejected,
                correlation_id,
                Some(reason.to_string()),
            ));
            return Err(reason);
        }

        let credits = self.capacity.course_credits(&course)?;
        let mut record =
            EnrollmentRecord::new(student, course, term, credits, correlation_id, now_ms());

        // Single serialization point per course: one compare-and-update
        // against the cached counter decides winner vs. waitlist.
        if self.capacity.try_reserve_seat(&record.course)? {
            record.transition(EnrollmentStatus::Enrolled, now_ms())?;
            if let Err(e) = self.persist_create(&record).await {
                self.capacity.release_seat(&record.course)?;
                return Err(e);
            }
            info!(student = %record.student, course = %record.course, "enrolled");
            self.emit(EventType::StudentEnrolled, &record, AuditAction::Enrolled, &actor, None)
                .await;
            return Ok(record);
        }

        if self.capacity.try_reserve_waitlist_slot(&record.course)? {
            let position = self.waitlist.enqueue(
                &record.course,
                record.student.clone(),
                priority,
            );
            record.transition(EnrollmentStatus::Waitlisted, now_ms())?;
            record.waitlist_position = Some(position);
            if let Err(e) = self.persist_create(&record).await {
                self.waitlist.cancel(&record.student, &record.course);
                self.capacity.release_waitlist_slot(&record.course)?;
                return Err(e);
            }
            info!(
                student = %record.student,
                course = %record.course,
                position,
                "waitlisted"
            );
            self.emit(
                EventType::StudentWaitlisted,
                &record,
                AuditAction::Waitlisted,
                &actor,
                Some(format!("position {position}")),
            )
            .await;
            return Ok(record);
        }

        self.audit.record(build_audit_entry(
            record.student,
            record.course,
            actor,
            AuditAction::Rejected,
            correlation_id,
            Some(EnrollmentError::WaitlistFull.to_string()),
        ));
        Err(EnrollmentError::WaitlistFull)
    }

    /// Drop an enrollment. Idempotent: dropping an already-dropped record
    /// returns it unchanged. Dropping an enrolled record frees the seat and
    /// promotes the earliest-eligible waitlisted student before returning.
    ///
    /// # Errors
    ///
    /// `EnrollmentNotFound` when no record exists for the pair;
    /// `InvalidStatusTransition` for completed/transferred records; `Store`
    /// after exhausted retries.
    pub async fn drop_enrollment(
        &self,
        student: StudentId,
        course: CourseId,
        reason: &str,
        actor: Actor,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let Some(mut record) = self.store.find(&student, &course)? else {
            return Err(EnrollmentError::EnrollmentNotFound);
        };

        match record.status {
            EnrollmentStatus::Dropped => {
                debug!(student = %student, course = %course, "drop is idempotent, already dropped");
                return Ok(record);
            }
            EnrollmentStatus::Waitlisted => {
                let correlation_id = Uuid::new_v4();
                record.correlation_id = correlation_id;
                self.waitlist.cancel(&record.student, &record.course);
                self.capacity.release_waitlist_slot(&record.course)?;
                record.transition(EnrollmentStatus::Dropped, now_ms())?;
                self.persist_update(&record).await?;
                self.emit(
                    EventType::EnrollmentDropped,
                    &record,
                    AuditAction::Dropped,
                    &actor,
                    Some(reason.to_string()),
                )
                .await;
                Ok(record)
            }
            EnrollmentStatus::Enrolled => {
                let correlation_id = Uuid::new_v4();
                record.correlation_id = correlation_id;
                record.transition(EnrollmentStatus::Dropped, now_ms())?;
                self.persist_update(&record).await?;
                self.capacity.release_seat(&record.course)?;
                self.emit(
                    EventType::EnrollmentDropped,
                    &record,
                    AuditAction::Dropped,
                    &actor,
                    Some(reason.to_string()),
                )
                .await;
                // Promotion runs synchronously, triggered by the vacated seat.
                self.promote_for(&record.course, correlation_id).await?;
                Ok(record)
            }
            other => Err(EnrollmentError::InvalidStatusTransition {
                from: other,
                to: EnrollmentStatus::Dropped,
            }),
        }
    }

    /// Transfer a student between courses as one logical action: the source
    /// seat is given up, the target request runs under the same correlation
    /// id, and a target failure triggers a compensating re-enroll into the
    /// source course. Promotion for the vacated source seat is deferred until
    /// the transfer resolves, so compensation normally finds it still free.
    ///
    /// # Errors
    ///
    /// Errors from the target-course request; `EnrollmentNotFound` or
    /// `InvalidStatusTransition` when the student is not enrolled in the
    /// source course; `Store` when compensation itself fails after retries.
    pub async fn transfer_enrollment(
        &self,
        student: StudentId,
        from_course: CourseId,
        to_course: CourseId,
        term: Term,
        actor: Actor,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let correlation_id = Uuid::new_v4();
        let Some(mut source) = self.store.find_active(&student, &from_course)? else {
            return Err(EnrollmentError::EnrollmentNotFound);
        };
        if source.status != EnrollmentStatus::Enrolled {
            return Err(EnrollmentError::InvalidStatusTransition {
                from: source.status,
                to: EnrollmentStatus::Transferred,
            });
        }

        source.correlation_id = correlation_id;
        source.transition(EnrollmentStatus::Transferred, now_ms())?;
        self.persist_update(&source).await?;
        self.capacity.release_seat(&from_course)?;
        self.emit(
            EventType::EnrollmentTransferred,
            &source,
            AuditAction::Transferred,
            &actor,
            Some(format!("to {to_course}")),
        )
        .await;

        match self
            .request_with_correlation(
                student.clone(),
                to_course.clone(),
                term,
                actor.clone(),
                correlation_id,
                WaitlistPriority::Normal,
            )
            .await
        {
            Ok(target) => {
                self.promote_for(&from_course, correlation_id).await?;
                Ok(target)
            }
            Err(primary) => {
                warn!(
                    student = %student,
                    from = %from_course,
                    to = %to_course,
                    error = %primary,
                    "transfer target failed, compensating"
                );
                self.compensate_transfer(student, from_course, term, correlation_id, actor)
                    .await?;
                Err(primary)
            }
        }
    }

    /// Compensating action for a failed transfer: re-enroll into the source
    /// course, or re-waitlist at High priority if an unrelated caller took
    /// the seat in the meantime.
    async fn compensate_transfer(
        &self,
        student: StudentId,
        course: CourseId,
        term: Term,
        correlation_id: Uuid,
        actor: Actor,
    ) -> Result<(), EnrollmentError> {
        let credits = self.capacity.course_credits(&course)?;
        let mut record = EnrollmentRecord::new(
            student,
            course,
            term,
            credits,
            correlation_id,
            now_ms(),
        );

        if self.capacity.try_reserve_seat(&record.course)? {
            record.transition(EnrollmentStatus::Enrolled, now_ms())?;
            if let Err(e) = self.persist_create(&record).await {
                error!(
                    student = %record.student,
                    course = %record.course,
                    error = %e,
                    "transfer compensation failed"
                );
                self.capacity.release_seat(&record.course)?;
                return Err(e);
            }
            self.emit(
                EventType::StudentEnrolled,
                &record,
                AuditAction::Enrolled,
                &actor,
                Some("transfer compensation".to_string()),
            )
            .await;
            return Ok(());
        }

        // Seat gone: keep the student from being lost entirely.
        if self.capacity.try_reserve_waitlist_slot(&record.course)? {
            let position = self.waitlist.enqueue(
                &record.course,
                record.student.clone(),
                WaitlistPriority::High,
            );
            record.transition(EnrollmentStatus::Waitlisted, now_ms())?;
            record.waitlist_position = Some(position);
            if let Err(e) = self.persist_create(&record).await {
                self.waitlist.cancel(&record.student, &record.course);
                self.capacity.release_waitlist_slot(&record.course)?;
                return Err(e);
            }
            self.emit(
                EventType::StudentWaitlisted,
                &record,
                AuditAction::Waitlisted,
                &actor,
                Some("transfer compensation".to_string()),
            )
            .await;
            return Ok(());
        }

        error!(
            student = %record.student,
            course = %record.course,
            "transfer compensation could not restore the seat"
        );
        Err(EnrollmentError::WaitlistFull)
    }

    /// Record completion of an enrolled course with a fixed-point grade
    /// (milli-grade-points, 4000 = 4.0).
    ///
    /// # Errors
    ///
    /// `EnrollmentNotFound` when no active record exists;
    /// `InvalidStatusTransition` unless the record is `Enrolled`; `Store`
    /// after exhausted retries.
    pub async fn record_completion(
        &self,
        student: StudentId,
        course: CourseId,
        grade_millis: u32,
        actor: Actor,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let Some(mut record) = self.store.find_active(&student, &course)? else {
            return Err(EnrollmentError::EnrollmentNotFound);
        };
        record.correlation_id = Uuid::new_v4();
        record.transition(EnrollmentStatus::Completed, now_ms())?;
        record.grade_millis = Some(grade_millis);
        self.persist_update(&record).await?;
        self.emit(
            EventType::EnrollmentCompleted,
            &record,
            AuditAction::Completed,
            &actor,
            Some(format!("grade {grade_millis} millis")),
        )
        .await;
        Ok(record)
    }

    /// Apply an administrative capacity change: reload limits from the
    /// provider and promote waitlisted students into any newly freed seats.
    /// Returns the number of students promoted.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and promotion write failures.
    pub async fn apply_capacity_change(&self, course: &CourseId) -> Result<u32, EnrollmentError> {
        self.capacity.invalidate(course);
        let snapshot = self.capacity.snapshot(course)?;
        info!(course = %course, capacity = snapshot.capacity, "capacity limits reapplied");
        let correlation_id = Uuid::new_v4();
        let mut promoted = 0_u32;
        while self.promote_for(course, correlation_id).await? {
            promoted += 1;
        }
        Ok(promoted)
    }

    /// Promote the earliest-eligible waitlisted student into the freed seat.
    /// Entries whose preconditions no longer hold are cancelled, audited,
    /// and notified, and the next entry is tried. Returns whether a student
    /// was promoted.
    async fn promote_for(
        &self,
        course: &CourseId,
        correlation_id: Uuid,
    ) -> Result<bool, EnrollmentError> {
        loop {
            let Some(entry) = self.waitlist.promote_next(course) else {
                return Ok(false);
            };
            self.capacity.release_waitlist_slot(course)?;

            let Some(mut record) = self.store.find_active(&entry.student, course)? else {
                // Queue entry without a backing record; nothing to promote.
                warn!(student = %entry.student, course = %course, "waitlist entry has no active record");
                continue;
            };

            if let Err(reason) = self.check_preconditions(&entry.student, course, record.term) {
                record.correlation_id = correlation_id;
                record.transition(EnrollmentStatus::Dropped, now_ms())?;
                self.persist_update(&record).await?;
                info!(
                    student = %entry.student,
                    course = %course,
                    reason = %reason,
                    "waitlist entry skipped"
                );
                self.emit(
                    EventType::WaitlistSkipped,
                    &record,
                    AuditAction::PromotionSkipped,
                    &Actor::System,
                    Some(reason.to_string()),
                )
                .await;
                continue;
            }

            if !self.capacity.try_reserve_seat(course)? {
                // A concurrent request claimed the seat first; put the entry
                // back with its original sequence number.
                let restore_slot = self.capacity.try_reserve_waitlist_slot(course)?;
                if !restore_slot {
                    warn!(course = %course, "waitlist slot not restorable after lost promotion race");
                }
                self.waitlist.restore(entry);
                return Ok(false);
            }

            record.correlation_id = correlation_id;
            record.transition(EnrollmentStatus::Enrolled, now_ms())?;
            if let Err(e) = self.persist_update(&record).await {
                error!(
                    student = %entry.student,
                    course = %course,
                    error = %e,
                    "promotion write failed, restoring entry"
                );
                self.capacity.release_seat(course)?;
                let _ = self.capacity.try_reserve_waitlist_slot(course)?;
                self.waitlist.restore(entry);
                return Err(e);
            }
            info!(student = %record.student, course = %course, "promoted from waitlist");
            self.emit(
                EventType::WaitlistPromoted,
                &record,
                AuditAction::Promoted,
                &Actor::System,
                None,
            )
            .await;
            return Ok(true);
        }
    }

    /// Evaluate the configured oracles in order, returning the first failure.
    fn check_preconditions(
        &self,
        student: &StudentId,
        course: &CourseId,
        term: Term,
    ) -> Result<(), EnrollmentError> {
        for oracle in &self.oracles {
            if let Err(reason) = oracle.check(student, course, term) {
                debug!(
                    oracle = oracle.name(),
                    student = %student,
                    course = %course,
                    reason = %reason,
                    "precondition failed"
                );
                return Err(reason);
            }
        }
        Ok(())
    }

    /// Current enrolled count for a course.
    ///
    /// # Errors
    ///
    /// Propagates capacity-provider failures.
    pub fn enrollment_count(&self, course: &CourseId) -> Result<u32, EnrollmentError> {
        Ok(self.capacity.snapshot(course)?.enrolled_count)
    }

    /// Current waitlist count for a course.
    ///
    /// # Errors
    ///
    /// Propagates capacity-provider failures.
    pub fn waitlist_count(&self, course: &CourseId) -> Result<u32, EnrollmentError> {
        Ok(self.capacity.snapshot(course)?.waitlist_count)
    }

    /// Live 1-based waitlist position of a student, if waiting.
    #[must_use]
    pub fn waitlist_position(&self, course: &CourseId, student: &StudentId) -> Option<u32> {
        self.waitlist.position_of(course, student)
    }

    /// Current capacity snapshot for a course.
    ///
    /// # Errors
    ///
    /// Propagates capacity-provider failures.
    pub fn capacity_snapshot(
        &self,
        course: &CourseId,
    ) -> Result<CourseCapacitySnapshot, EnrollmentError> {
        self.capacity.snapshot(course)
    }

    async fn persist_create(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        self.with_retry(|| self.store.create(record)).await
    }

    async fn persist_update(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        self.with_retry(|| self.store.update(record)).await
    }

    /// Retry transient store failures a bounded number of times with linear
    /// backoff; all other errors surface immediately.
    async fn with_retry<F>(&self, mut op: F) -> Result<(), EnrollmentError>
    where
        F: FnMut() -> Result<(), EnrollmentError>,
    {
        let mut attempt = 1_u32;
        loop {
            match op() {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(attempt, error = %e, "transient store failure, retrying");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Emit the event, then the audit entry, after the authoritative
    /// mutation is durable.
    async fn emit(
        &self,
        event_type: EventType,
        record: &EnrollmentRecord,
        action: AuditAction,
        actor: &Actor,
        detail: Option<String>,
    ) {
        let event = EventRecord::new(event_type, record.clone(), EVENT_SOURCE);
        self.dispatcher.publish(event).await;
        self.audit.record(build_audit_entry(
            record.student.clone(),
            record.course.clone(),
            actor.clone(),
            action,
            record.correlation_id,
            detail,
        ));
    }
}
