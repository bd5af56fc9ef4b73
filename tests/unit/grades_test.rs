//! Tests for grade aggregation over the store

use std::sync::Arc;

use registrar_engine::core::{EnrollmentStore, GradeAggregator};
use registrar_engine::domain::{
    CourseId, EnrollmentRecord, EnrollmentStatus, Semester, StudentId, Term,
};
use registrar_engine::infra::InMemoryEnrollmentStore;
use uuid::Uuid;

fn completed(student: &str, course: &str, credits: u32, grade: Option<u32>) -> EnrollmentRecord {
    let mut record = EnrollmentRecord::new(
        StudentId::from(student),
        CourseId::from(course),
        Term::new(Semester::Spring, 2026),
        credits,
        Uuid::new_v4(),
        0,
    );
    record.transition(EnrollmentStatus::Enrolled, 1).unwrap();
    record.transition(EnrollmentStatus::Completed, 2).unwrap();
    record.grade_millis = grade;
    record
}

#[test]
fn test_course_statistics_over_store() {
    let store = Arc::new(InMemoryEnrollmentStore::new());
    store.create(&completed("s1", "CS-101", 4, Some(4000))).unwrap();
    store.create(&completed("s2", "CS-101", 4, Some(2000))).unwrap();
    store.create(&completed("s3", "CS-101", 4, Some(500))).unwrap();
    // Different course must not leak into CS-101 statistics.
    store.create(&completed("s1", "MATH-201", 3, Some(1000))).unwrap();

    let aggregator = GradeAggregator::new(store, 2);
    let stats = aggregator
        .course_statistics(&CourseId::from("CS-101"))
        .unwrap();

    assert_eq!(stats.completed, 3);
    assert_eq!(stats.gpa_millis, Some(2167)); // 6500/3 rounded half-up
    assert_eq!(stats.pass_rate_bp, Some(6667)); // 2 of 3 graded pass
    assert_eq!(stats.distribution.a, 1);
    assert_eq!(stats.distribution.c, 1);
    assert_eq!(stats.distribution.f, 1);
}

#[test]
fn test_student_gpa_spans_courses() {
    let store = Arc::new(InMemoryEnrollmentStore::new());
    store.create(&completed("s1", "CS-101", 4, Some(4000))).unwrap();
    store.create(&completed("s1", "MATH-201", 3, Some(3000))).unwrap();
    store.create(&completed("s2", "CS-101", 4, Some(1000))).unwrap();

    let aggregator = GradeAggregator::new(store, 1);
    let stats = aggregator.student_gpa(&StudentId::from("s1")).unwrap();

    assert_eq!(stats.completed, 2);
    // (4000*4 + 3000*3) / 7 = 25000/7 = 3571.4 -> 3571
    assert_eq!(stats.gpa_millis, Some(3571));
}

#[test]
fn test_student_without_completions() {
    let store = Arc::new(InMemoryEnrollmentStore::new());
    let aggregator = GradeAggregator::new(store, 1);
    let stats = aggregator.student_gpa(&StudentId::from("nobody")).unwrap();
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.gpa_millis, None);
    assert_eq!(stats.pass_rate_bp, None);
}
