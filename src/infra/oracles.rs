//! Ready-made precondition oracles.
//!
//! Production deployments wire oracles over live schedule, transcript, and
//! bursar data; these implementations cover single-node runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::core::coordinator::PreconditionOracle;
use crate::core::error::EnrollmentError;
use crate::domain::{CourseId, StudentId, Term};

/// Oracle that clears every request.
#[derive(Debug, Default)]
pub struct AlwaysEligible;

impl PreconditionOracle for AlwaysEligible {
    fn name(&self) -> &str {
        "always-eligible"
    }

    fn check(&self, _: &StudentId, _: &CourseId, _: Term) -> Result<(), EnrollmentError> {
        Ok(())
    }
}

/// Oracle with explicit per-(student, course) verdicts; anything not listed
/// is allowed. Useful for holds, prerequisites, and probation scenarios.
pub struct StaticVerdicts {
    name: String,
    verdicts: RwLock<HashMap<(StudentId, CourseId), EnrollmentError>>,
}

impl StaticVerdicts {
    /// Named oracle with no verdicts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    /// Deny the pair with the given reason.
    pub fn deny(&self, student: StudentId, course: CourseId, reason: EnrollmentError) {
        self.verdicts.write().insert((student, course), reason);
    }

    /// Remove a standing denial, if any.
    pub fn clear(&self, student: &StudentId, course: &CourseId) {
        self.verdicts
            .write()
            .remove(&(student.clone(), course.clone()));
    }
}

impl PreconditionOracle for StaticVerdicts {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(
        &self,
        student: &StudentId,
        course: &CourseId,
        _: Term,
    ) -> Result<(), EnrollmentError> {
        match self
            .verdicts
            .read()
            .get(&(student.clone(), course.clone()))
        {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }
}

/// Calendar gate: rejects every request with `EnrollmentClosed` while shut.
pub struct EnrollmentWindow {
    open: AtomicBool,
}

impl EnrollmentWindow {
    /// Window in the given initial state.
    #[must_use]
    pub const fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    /// Open or close the window.
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }
}

impl PreconditionOracle for EnrollmentWindow {
    fn name(&self) -> &str {
        "enrollment-window"
    }

    fn check(&self, _: &StudentId, _: &CourseId, _: Term) -> Result<(), EnrollmentError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EnrollmentError::EnrollmentClosed)
        }
    }
}
