//! Domain model shared across the engine: identifiers, terms, and records.

pub mod record;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use record::{EnrollmentRecord, EnrollmentStatus};

/// Identifier of a student as issued by the records system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(String);

impl StudentId {
    /// Create a student identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a course offering (e.g. `CS101`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(String);

impl CourseId {
    /// Create a course identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Academic semester within a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    /// Spring term.
    Spring,
    /// Summer term.
    Summer,
    /// Fall term.
    Fall,
    /// Winter term.
    Winter,
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
            Self::Winter => "winter",
        };
        f.write_str(name)
    }
}

/// Semester/year pair identifying when a course offering runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Semester of the offering.
    pub semester: Semester,
    /// Calendar year of the offering.
    pub year: u16,
}

impl Term {
    /// Create a term from a semester and year.
    #[must_use]
    pub const fn new(semester: Semester, year: u16) -> Self {
        Self { semester, year }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.semester, self.year)
    }
}

/// Service priority of a waitlist entry. High entries (instructor overrides)
/// are served before Normal ones regardless of arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistPriority {
    /// Default priority for student-initiated requests.
    #[default]
    Normal,
    /// Instructor-override priority, served first.
    High,
}

impl WaitlistPriority {
    pub(crate) const fn rank(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::High => 1,
        }
    }
}
