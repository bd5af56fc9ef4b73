//! In-memory enrollment store used by tests, demos, and single-node runs.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::core::coordinator::{EnrollmentStore, SnapshotFilter};
use crate::core::error::EnrollmentError;
use crate::domain::{CourseId, EnrollmentRecord, EnrollmentStatus, StudentId};

/// Enrollment store backed by a mutex-guarded map of per-pair histories.
///
/// The single lock makes `create` an atomic check-and-insert, which is what
/// gives the duplicate guard its race freedom.
#[derive(Default)]
pub struct InMemoryEnrollmentStore {
    records: Mutex<HashMap<(StudentId, CourseId), Vec<EnrollmentRecord>>>,
}

impl InMemoryEnrollmentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full history for a pair, oldest first. Test and reporting helper.
    #[must_use]
    pub fn history(&self, student: &StudentId, course: &CourseId) -> Vec<EnrollmentRecord> {
        self.records
            .lock()
            .get(&(student.clone(), course.clone()))
            .cloned()
            .unwrap_or_default()
    }
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn create(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        let mut records = self.records.lock();
        let history = records
            .entry((record.student.clone(), record.course.clone()))
            .or_default();
        if history.last().is_some_and(|r| !r.status.is_terminal()) {
            return Err(EnrollmentError::DuplicateEnrollment {
                course: record.course.to_string(),
            });
        }
        history.push(record.clone());
        Ok(())
    }

    fn update(&self, record: &EnrollmentRecord) -> Result<(), EnrollmentError> {
        let mut records = self.records.lock();
        let Some(history) = records.get_mut(&(record.student.clone(), record.course.clone()))
        else {
            return Err(EnrollmentError::EnrollmentNotFound);
        };
        let Some(last) = history.last_mut() else {
            return Err(EnrollmentError::EnrollmentNotFound);
        };
        *last = record.clone();
        Ok(())
    }

    fn find(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        Ok(self
            .records
            .lock()
            .get(&(student.clone(), course.clone()))
            .and_then(|h| h.last().cloned()))
    }

    fn find_active(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        Ok(self
            .find(student, course)?
            .filter(|r| !r.status.is_terminal()))
    }

    fn has_active(&self, student: &StudentId, course: &CourseId) -> Result<bool, EnrollmentError> {
        Ok(self.find_active(student, course)?.is_some())
    }

    fn completed_snapshot(
        &self,
        filter: &SnapshotFilter,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        // One lock acquisition gives the consistent point-in-time view.
        let records = self.records.lock();
        Ok(records
            .values()
            .flatten()
            .filter(|r| r.status == EnrollmentStatus::Completed)
            .filter(|r| filter.course.as_ref().is_none_or(|c| &r.course == c))
            .filter(|r| filter.student.as_ref().is_none_or(|s| &r.student == s))
            .filter(|r| filter.term.is_none_or(|t| r.term == t))
            .cloned()
            .collect())
    }
}
