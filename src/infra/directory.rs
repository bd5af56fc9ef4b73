//! In-memory directory of known students and courses.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::core::coordinator::DirectoryService;
use crate::core::error::EnrollmentError;
use crate::domain::{CourseId, StudentId};

/// Directory backed by in-memory sets, populated up front.
#[derive(Default)]
pub struct InMemoryDirectory {
    students: RwLock<HashSet<StudentId>>,
    courses: RwLock<HashSet<CourseId>>,
}

impl InMemoryDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a student id.
    pub fn add_student(&self, student: StudentId) {
        self.students.write().insert(student);
    }

    /// Register a course id.
    pub fn add_course(&self, course: CourseId) {
        self.courses.write().insert(course);
    }
}

impl DirectoryService for InMemoryDirectory {
    fn student_exists(&self, student: &StudentId) -> Result<bool, EnrollmentError> {
        Ok(self.students.read().contains(student))
    }

    fn course_exists(&self, course: &CourseId) -> Result<bool, EnrollmentError> {
        Ok(self.courses.read().contains(course))
    }
}
