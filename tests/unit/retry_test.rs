//! Tests for transient store failure handling

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use registrar_engine::builders::{EngineBuilder, EnrollmentEngine};
use registrar_engine::config::EngineConfig;
use registrar_engine::core::{
    Actor, CourseLimits, EnrollmentError, EnrollmentStore, SnapshotFilter,
};
use registrar_engine::domain::{
    CourseId, EnrollmentRecord, EnrollmentStatus, Semester, StudentId, Term,
};
use registrar_engine::infra::{InMemoryCourseCatalog, InMemoryDirectory, InMemoryEnrollmentStore};
use registrar_engine::runtime::TokioSpawner;

/// Store wrapper that fails the first `failures` create calls with a
/// transient error, then delegates.
struct FlakyStore {
    inner: InMemoryEnrollmentStore,
    remaining_failures: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryEnrollmentStore::new(),
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

impl EnrollmentStore for FlakyStore {
    fn create(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        if self
            .remaining_failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EnrollmentError::Store("connection reset".into()));
        }
        self.inner.create(record)
    }

    fn update(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        self.inner.update(record)
    }

    fn find(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        self.inner.find(student, course)
    }

    fn find_active(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        self.inner.find_active(student, course)
    }

    fn has_active(&self, student: &StudentId, course: &CourseId) -> Result<bool, EnrollmentError> {
        self.inner.has_active(student, course)
    }

    fn completed_snapshot(
        &self,
        filter: &SnapshotFilter,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        self.inner.completed_snapshot(filter)
    }
}

fn engine_with_flaky_store(failures: u32) -> (EnrollmentEngine<TokioSpawner>, CourseId, StudentId) {
    let course = CourseId::from("CS-101");
    let student = StudentId::from("S-1");
    let directory = Arc::new(InMemoryDirectory::new());
    directory.add_student(student.clone());
    directory.add_course(course.clone());
    let catalog = Arc::new(InMemoryCourseCatalog::new());
    catalog.upsert(
        course.clone(),
        CourseLimits {
            capacity: 5,
            waitlist_capacity: 5,
            credits: 3,
        },
    );
    let engine = EngineBuilder::new(EngineConfig {
        store_retry_max_attempts: 3,
        store_retry_backoff_ms: 1,
        ..EngineConfig::default()
    })
    .with_store(Arc::new(FlakyStore::new(failures)))
    .with_directory(directory)
    .with_capacity_provider(catalog)
    .with_spawner(TokioSpawner::current())
    .build()
    .expect("engine builds");
    (engine, course, student)
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (engine, course, student) = engine_with_flaky_store(2);
    let record = engine
        .coordinator
        .request_enrollment(student, course.clone(), Term::new(Semester::Fall, 2026), Actor::System)
        .await
        .unwrap();
    assert_eq!(record.status, EnrollmentStatus::Enrolled);
    assert_eq!(engine.coordinator.enrollment_count(&course).unwrap(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_release_the_seat() {
    let (engine, course, student) = engine_with_flaky_store(10);
    let err = engine
        .coordinator
        .request_enrollment(student, course.clone(), Term::new(Semester::Fall, 2026), Actor::System)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::Store(_)));
    // The speculative seat reservation was rolled back.
    assert_eq!(engine.coordinator.enrollment_count(&course).unwrap(), 0);
}
