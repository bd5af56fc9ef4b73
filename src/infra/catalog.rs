//! In-memory course catalog acting as the capacity system of record.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::core::capacity::{CapacityProvider, CourseLimits};
use crate::core::error::EnrollmentError;
use crate::domain::CourseId;

/// Catalog of course limits, loadable by the capacity cache.
#[derive(Default)]
pub struct InMemoryCourseCatalog {
    limits: RwLock<HashMap<CourseId, CourseLimits>>,
    loads: AtomicU64,
}

impl InMemoryCourseCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a course's limits.
    pub fn upsert(&self, course: CourseId, limits: CourseLimits) {
        self.limits.write().insert(course, limits);
    }

    /// Administrative capacity change; waitlist capacity and credits are
    /// left as they are. No-op for unknown courses.
    pub fn set_capacity(&self, course: &CourseId, capacity: u32) {
        if let Some(limits) = self.limits.write().get_mut(course) {
            limits.capacity = capacity;
        }
    }

    /// Number of `load` calls served, for cache-behavior assertions.
    #[must_use]
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl CapacityProvider for InMemoryCourseCatalog {
    fn load(&self, course: &CourseId) -> Result<CourseLimits, EnrollmentError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.limits
            .read()
            .get(course)
            .copied()
            .ok_or_else(|| EnrollmentError::CourseNotFound(course.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_counts_and_misses() {
        let catalog = InMemoryCourseCatalog::new();
        let course = CourseId::from("CS-101");
        catalog.upsert(
            course.clone(),
            CourseLimits {
                capacity: 30,
                waitlist_capacity: 10,
                credits: 3,
            },
        );
        assert_eq!(catalog.load(&course).unwrap().capacity, 30);
        assert!(matches!(
            catalog.load(&CourseId::from("NOPE-1")),
            Err(EnrollmentError::CourseNotFound(_))
        ));
        assert_eq!(catalog.loads(), 2);
    }

    #[test]
    fn set_capacity_changes_only_capacity() {
        let catalog = InMemoryCourseCatalog::new();
        let course = CourseId::from("CS-101");
        catalog.upsert(
            course.clone(),
            CourseLimits {
                capacity: 30,
                waitlist_capacity: 10,
                credits: 3,
            },
        );
        catalog.set_capacity(&course, 45);
        let limits = catalog.load(&course).unwrap();
        assert_eq!(limits.capacity, 45);
        assert_eq!(limits.waitlist_capacity, 10);
        assert_eq!(limits.credits, 3);
    }
}
