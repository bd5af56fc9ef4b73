//! Read-through course capacity cache with atomic seat reservation.
//!
//! The cache is the single holder of in-memory enrolled/waitlisted counters;
//! every other component reserves and releases through it so counts never
//! diverge. Seat reservation is one compare-and-update against the cached
//! counter, closing the race between two simultaneous requests for the last
//! seat without taking a lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::error::EnrollmentError;
use crate::domain::CourseId;
use crate::util::clock::now_ms_u64;

/// Authoritative facts about a course offering, supplied by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseLimits {
    /// Maximum students in `Enrolled` status.
    pub capacity: u32,
    /// Maximum students queued on the waitlist.
    pub waitlist_capacity: u32,
    /// Credit hours the course carries.
    pub credits: u32,
}

/// Authoritative source of course limits, consulted on cache miss and when a
/// cached entry passes its staleness window.
pub trait CapacityProvider: Send + Sync {
    /// Load the authoritative limits for a course.
    ///
    /// # Errors
    ///
    /// `CourseNotFound` when the course does not exist; `Store` on backend
    /// failure.
    fn load(&self, course: &CourseId) -> Result<CourseLimits, EnrollmentError>;
}

/// Point-in-time view of one course's capacity and counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCapacitySnapshot {
    /// Course the snapshot describes.
    pub course: CourseId,
    /// Seat capacity fixed for the semester.
    pub capacity: u32,
    /// Students currently enrolled.
    pub enrolled_count: u32,
    /// Students currently waitlisted.
    pub waitlist_count: u32,
    /// Waitlist capacity.
    pub waitlist_capacity: u32,
}

/// Cached per-course counters. Limits are refreshed in place so counters
/// survive an administrative capacity change.
struct CacheEntry {
    capacity: AtomicU32,
    waitlist_capacity: AtomicU32,
    credits: AtomicU32,
    enrolled: AtomicU32,
    waitlisted: AtomicU32,
    loaded_at_ms: AtomicU64,
}

impl CacheEntry {
    fn new(limits: CourseLimits, now_ms: u64) -> Self {
        Self {
            capacity: AtomicU32::new(limits.capacity),
            waitlist_capacity: AtomicU32::new(limits.waitlist_capacity),
            credits: AtomicU32::new(limits.credits),
            enrolled: AtomicU32::new(0),
            waitlisted: AtomicU32::new(0),
            loaded_at_ms: AtomicU64::new(now_ms),
        }
    }

    fn apply_limits(&self, limits: CourseLimits, now_ms: u64) {
        self.capacity.store(limits.capacity, Ordering::Release);
        self.waitlist_capacity
            .store(limits.waitlist_capacity, Ordering::Release);
        self.credits.store(limits.credits, Ordering::Release);
        self.loaded_at_ms.store(now_ms, Ordering::Release);
    }

    /// CAS loop: increment `counter` iff below `limit`.
    fn try_take(counter: &AtomicU32, limit: u32) -> bool {
        let mut current = counter.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return false;
            }
            match counter.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// CAS loop: decrement `counter` with a floor of zero.
    fn release(counter: &AtomicU32) {
        let mut current = counter.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return;
            }
            match counter.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Read-through cache of per-course capacity, keyed by course id.
pub struct CapacityCache {
    entries: RwLock<HashMap<CourseId, Arc<CacheEntry>>>,
    provider: Arc<dyn CapacityProvider>,
    refresh_interval: Duration,
}

impl CapacityCache {
    /// Create a cache over the given authoritative provider. Entries older
    /// than `refresh_interval` reload their limits on next access.
    pub fn new(provider: Arc<dyn CapacityProvider>, refresh_interval: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            provider,
            refresh_interval,
        }
    }

    /// Resolve the cached entry for a course, loading limits on miss and
    /// refreshing them when the staleness window has passed. Provider I/O
    /// happens outside any lock on the entry map's read path.
    fn entry(&self, course: &CourseId) -> Result<Arc<CacheEntry>, EnrollmentError> {
        let now = now_ms_u64();
        let refresh_ms = u64::try_from(self.refresh_interval.as_millis()).unwrap_or(u64::MAX);

        let hit = self.entries.read().get(course).cloned();
        if let Some(entry) = hit {
            let loaded = entry.loaded_at_ms.load(Ordering::Acquire);
            let stale = loaded == 0 || now.saturating_sub(loaded) >= refresh_ms;
            if stale {
                let limits = self.provider.load(course)?;
                entry.apply_limits(limits, now);
                debug!(course = %course, capacity = limits.capacity, "capacity limits refreshed");
            }
            return Ok(entry);
        }

        let limits = self.provider.load(course)?;
        let mut entries = self.entries.write();
        let entry = entries
            .entry(course.clone())
            .or_insert_with(|| Arc::new(CacheEntry::new(limits, now)));
        Ok(Arc::clone(entry))
    }

    /// Current snapshot of the course's capacity and counts.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn snapshot(&self, course: &CourseId) -> Result<CourseCapacitySnapshot, EnrollmentError> {
        let entry = self.entry(course)?;
        Ok(CourseCapacitySnapshot {
            course: course.clone(),
            capacity: entry.capacity.load(Ordering::Acquire),
            enrolled_count: entry.enrolled.load(Ordering::Acquire),
            waitlist_count: entry.waitlisted.load(Ordering::Acquire),
            waitlist_capacity: entry.waitlist_capacity.load(Ordering::Acquire),
        })
    }

    /// Credit hours for the course, from the cached limits.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn course_credits(&self, course: &CourseId) -> Result<u32, EnrollmentError> {
        Ok(self.entry(course)?.credits.load(Ordering::Acquire))
    }

    /// Atomically claim a seat iff `enrolled < capacity`. This is the single
    /// serialization point per course for enrollment decisions.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn try_reserve_seat(&self, course: &CourseId) -> Result<bool, EnrollmentError> {
        let entry = self.entry(course)?;
        let capacity = entry.capacity.load(Ordering::Acquire);
        Ok(CacheEntry::try_take(&entry.enrolled, capacity))
    }

    /// Release one seat, saturating at zero.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn release_seat(&self, course: &CourseId) -> Result<(), EnrollmentError> {
        let entry = self.entry(course)?;
        CacheEntry::release(&entry.enrolled);
        Ok(())
    }

    /// Atomically claim a waitlist slot iff `waitlisted < waitlist_capacity`.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn try_reserve_waitlist_slot(&self, course: &CourseId) -> Result<bool, EnrollmentError> {
        let entry = self.entry(course)?;
        let limit = entry.waitlist_capacity.load(Ordering::Acquire);
        Ok(CacheEntry::try_take(&entry.waitlisted, limit))
    }

    /// Release one waitlist slot, saturating at zero.
    ///
    /// # Errors
    ///
    /// Propagates provider failures on miss or refresh.
    pub fn release_waitlist_slot(&self, course: &CourseId) -> Result<(), EnrollmentError> {
        let entry = self.entry(course)?;
        CacheEntry::release(&entry.waitlisted);
        Ok(())
    }

    /// Force a limits reload on next access, e.g. after an administrative
    /// capacity change. Counters are preserved.
    pub fn invalidate(&self, course: &CourseId) {
        if let Some(entry) = self.entries.read().get(course) {
            entry.loaded_at_ms.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedProvider {
        limits: Mutex<CourseLimits>,
        loads: AtomicU32,
    }

    impl FixedProvider {
        fn new(capacity: u32, waitlist_capacity: u32) -> Self {
            Self {
                limits: Mutex::new(CourseLimits {
                    capacity,
                    waitlist_capacity,
                    credits: 3,
                }),
                loads: AtomicU32::new(0),
            }
        }
    }

    impl CapacityProvider for FixedProvider {
        fn load(&self, _course: &CourseId) -> Result<CourseLimits, EnrollmentError> {
            self.loads.fetch_add(1, Ordering::Relaxed);
            Ok(*self.limits.lock())
        }
    }

    fn cache_with(capacity: u32, waitlist: u32) -> (CapacityCache, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider::new(capacity, waitlist));
        let cache = CapacityCache::new(provider.clone(), Duration::from_secs(3600));
        (cache, provider)
    }

    #[test]
    fn test_reserve_up_to_capacity() {
        let (cache, _) = cache_with(2, 5);
        let course = CourseId::from("CS101");

        assert!(cache.try_reserve_seat(&course).unwrap());
        assert!(cache.try_reserve_seat(&course).unwrap());
        assert!(!cache.try_reserve_seat(&course).unwrap());

        let snap = cache.snapshot(&course).unwrap();
        assert_eq!(snap.enrolled_count, 2);
        assert_eq!(snap.capacity, 2);
    }

    #[test]
    fn test_release_frees_a_seat() {
        let (cache, _) = cache_with(1, 5);
        let course = CourseId::from("CS101");

        assert!(cache.try_reserve_seat(&course).unwrap());
        assert!(!cache.try_reserve_seat(&course).unwrap());
        cache.release_seat(&course).unwrap();
        assert!(cache.try_reserve_seat(&course).unwrap());
    }

    #[test]
    fn test_release_saturates_at_zero() {
        let (cache, _) = cache_with(3, 5);
        let course = CourseId::from("CS101");

        cache.release_seat(&course).unwrap();
        assert_eq!(cache.snapshot(&course).unwrap().enrolled_count, 0);
    }

    #[test]
    fn test_waitlist_slots_bounded() {
        let (cache, _) = cache_with(0, 2);
        let course = CourseId::from("CS101");

        assert!(!cache.try_reserve_seat(&course).unwrap());
        assert!(cache.try_reserve_waitlist_slot(&course).unwrap());
        assert!(cache.try_reserve_waitlist_slot(&course).unwrap());
        assert!(!cache.try_reserve_waitlist_slot(&course).unwrap());
    }

    #[test]
    fn test_invalidate_reloads_limits_and_keeps_counts() {
        let (cache, provider) = cache_with(1, 5);
        let course = CourseId::from("CS101");

        assert!(cache.try_reserve_seat(&course).unwrap());
        assert!(!cache.try_reserve_seat(&course).unwrap());

        provider.limits.lock().capacity = 3;
        cache.invalidate(&course);

        let snap = cache.snapshot(&course).unwrap();
        assert_eq!(snap.capacity, 3);
        assert_eq!(snap.enrolled_count, 1);
        assert!(cache.try_reserve_seat(&course).unwrap());
        assert!(provider.loads.load(Ordering::Relaxed) >= 2);
    }

    #[test]
    fn test_concurrent_reservation_never_oversells() {
        let provider = Arc::new(FixedProvider::new(10, 0));
        let cache = Arc::new(CapacityCache::new(provider, Duration::from_secs(3600)));
        let course = CourseId::from("CS101");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let course = course.clone();
            handles.push(std::thread::spawn(move || {
                let mut won = 0_u32;
                for _ in 0..10 {
                    if cache.try_reserve_seat(&course).unwrap() {
                        won += 1;
                    }
                }
                won
            }));
        }
        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
        assert_eq!(cache.snapshot(&course).unwrap().enrolled_count, 10);
    }
}
