//! Tests for the audit sink

use registrar_engine::core::{
    build_audit_entry, Actor, AuditAction, AuditSink, InMemoryAuditSink,
};
use registrar_engine::domain::{CourseId, StudentId};
use uuid::Uuid;

fn record(
    sink: &InMemoryAuditSink,
    student: &str,
    course: &str,
    actor: Actor,
    action: AuditAction,
    correlation: Uuid,
) {
    sink.record(build_audit_entry(
        StudentId::from(student),
        CourseId::from(course),
        actor,
        action,
        correlation,
        None,
    ));
}

#[test]
fn test_queries_filter_entries() {
    let sink = InMemoryAuditSink::new(100);
    let correlation = Uuid::new_v4();
    record(&sink, "s1", "CS-101", Actor::System, AuditAction::Enrolled, correlation);
    record(&sink, "s1", "CS-101", Actor::System, AuditAction::Dropped, correlation);
    record(
        &sink,
        "s2",
        "CS-101",
        Actor::User("registrar-7".into()),
        AuditAction::Enrolled,
        Uuid::new_v4(),
    );

    assert_eq!(sink.entries().len(), 3);
    assert_eq!(
        sink.by_entity(&StudentId::from("s1"), &CourseId::from("CS-101")).len(),
        2
    );
    assert_eq!(sink.by_actor(&Actor::User("registrar-7".into())).len(), 1);
    assert_eq!(sink.by_action(AuditAction::Enrolled).len(), 2);
    assert_eq!(sink.by_correlation(correlation).len(), 2);
}

#[test]
fn test_overflow_evicts_oldest() {
    let sink = InMemoryAuditSink::new(2);
    record(&sink, "s1", "C1", Actor::System, AuditAction::Enrolled, Uuid::new_v4());
    record(&sink, "s2", "C1", Actor::System, AuditAction::Enrolled, Uuid::new_v4());
    record(&sink, "s3", "C1", Actor::System, AuditAction::Enrolled, Uuid::new_v4());

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].student, StudentId::from("s2"));
    assert_eq!(entries[1].student, StudentId::from("s3"));
}

#[test]
fn test_by_range_uses_half_open_interval() {
    let sink = InMemoryAuditSink::new(10);
    record(&sink, "s1", "C1", Actor::System, AuditAction::Enrolled, Uuid::new_v4());
    let entries = sink.entries();
    let at = entries[0].created_at_ms;

    assert_eq!(sink.by_range(at, at + 1).len(), 1);
    assert_eq!(sink.by_range(at + 1, at + 2).len(), 0);
    assert_eq!(sink.by_range(0, at).len(), 0);
}

#[test]
fn test_export_json_is_parseable() {
    let sink = InMemoryAuditSink::new(10);
    record(&sink, "s1", "CS-101", Actor::System, AuditAction::Waitlisted, Uuid::new_v4());

    let json = sink.export_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["action"], "waitlisted");
    assert_eq!(array[0]["student"], "s1");
}

#[test]
fn test_clones_share_the_buffer() {
    let sink = InMemoryAuditSink::new(10);
    let handle = sink.clone();
    record(&sink, "s1", "C1", Actor::System, AuditAction::Enrolled, Uuid::new_v4());
    assert_eq!(handle.entries().len(), 1);
}
