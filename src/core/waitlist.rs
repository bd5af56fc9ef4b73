//! Per-course waitlists served by (priority desc, arrival order asc).
//!
//! Each course has its own queue guarded by its own mutex, so waitlist
//! operations on different courses never contend. Cancellation is lazy:
//! cancelled students are marked and skipped when they reach the head.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::domain::{CourseId, StudentId, WaitlistPriority};

/// A pending claim on the next free seat in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEntry {
    /// Course the student is waiting on.
    pub course: CourseId,
    /// Waiting student.
    pub student: StudentId,
    /// Monotonic sequence number; breaks ties deterministically instead of
    /// wall-clock time.
    pub enqueued_seq: u64,
    /// Service priority.
    pub priority: WaitlistPriority,
}

impl WaitlistEntry {
    /// Whether this entry is served before `other` under the ordering
    /// invariant (priority desc, sequence asc).
    #[must_use]
    pub fn serves_before(&self, other: &Self) -> bool {
        match self.priority.rank().cmp(&other.priority.rank()) {
            CmpOrdering::Greater => true,
            CmpOrdering::Less => false,
            CmpOrdering::Equal => self.enqueued_seq < other.enqueued_seq,
        }
    }
}

/// Max-heap wrapper: highest priority first, FIFO within a priority.
struct OrderedEntry(WaitlistEntry);

impl PartialEq for OrderedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.enqueued_seq == other.0.enqueued_seq
    }
}

impl Eq for OrderedEntry {}

impl PartialOrd for OrderedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        match self.0.priority.rank().cmp(&other.0.priority.rank()) {
            // FIFO within same priority: earlier sequence wins (reversed for max-heap)
            CmpOrdering::Equal => other.0.enqueued_seq.cmp(&self.0.enqueued_seq),
            other_order => other_order,
        }
    }
}

#[derive(Default)]
struct CourseQueue {
    heap: BinaryHeap<OrderedEntry>,
    cancelled: HashSet<StudentId>,
}

impl CourseQueue {
    fn active_count(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.0.student))
            .count()
    }
}

/// Manager of per-course waitlist queues. Mutated only by the enrollment
/// coordinator.
pub struct WaitlistManager {
    queues: RwLock<HashMap<CourseId, Arc<Mutex<CourseQueue>>>>,
    seq: AtomicU64,
}

impl WaitlistManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn queue(&self, course: &CourseId) -> Arc<Mutex<CourseQueue>> {
        if let Some(q) = self.queues.read().get(course) {
            return Arc::clone(q);
        }
        let mut queues = self.queues.write();
        Arc::clone(queues.entry(course.clone()).or_default())
    }

    /// Append a student, respecting the (priority desc, sequence asc)
    /// ordering invariant. Returns the 1-based position at which the entry
    /// will be served.
    pub fn enqueue(
        &self,
        course: &CourseId,
        student: StudentId,
        priority: WaitlistPriority,
    ) -> u32 {
        let entry = WaitlistEntry {
            course: course.clone(),
            student,
            enqueued_seq: self.seq.fetch_add(1, Ordering::Relaxed),
            priority,
        };
        let queue = self.queue(course);
        let mut queue = queue.lock();
        // Re-joining clears any stale cancellation mark.
        queue.cancelled.remove(&entry.student);
        let ahead = queue
            .heap
            .iter()
            .filter(|e| !queue.cancelled.contains(&e.0.student))
            .filter(|e| e.0.serves_before(&entry))
            .count();
        queue.heap.push(OrderedEntry(entry));
        u32::try_from(ahead).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    /// Pop the earliest-eligible entry, skipping cancelled students. `None`
    /// when the course has no active entries.
    pub fn promote_next(&self, course: &CourseId) -> Option<WaitlistEntry> {
        let queue = self.queue(course);
        let mut queue = queue.lock();
        while let Some(OrderedEntry(entry)) = queue.heap.pop() {
            if queue.cancelled.remove(&entry.student) {
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Push an entry back preserving its original sequence number, e.g. when
    /// the freed seat was claimed by a concurrent request before the
    /// promotion could land.
    pub fn restore(&self, entry: WaitlistEntry) {
        let queue = self.queue(&entry.course);
        queue.lock().heap.push(OrderedEntry(entry));
    }

    /// Mark a student's entry cancelled, if present. Returns whether an
    /// active entry existed. No-op otherwise.
    pub fn cancel(&self, student: &StudentId, course: &CourseId) -> bool {
        let queue = self.queue(course);
        let mut queue = queue.lock();
        let present = queue
            .heap
            .iter()
            .any(|e| &e.0.student == student && !queue.cancelled.contains(student));
        if present {
            queue.cancelled.insert(student.clone());
        }
        present
    }

    /// 1-based position of a student among active entries, or `None` when
    /// the student is not waiting.
    #[must_use]
    pub fn position_of(&self, course: &CourseId, student: &StudentId) -> Option<u32> {
        let queue = self.queue(course);
        let queue = queue.lock();
        if queue.cancelled.contains(student) {
            return None;
        }
        let target = queue.heap.iter().find(|e| &e.0.student == student)?;
        let ahead = queue
            .heap
            .iter()
            .filter(|e| !queue.cancelled.contains(&e.0.student))
            .filter(|e| e.0.serves_before(&target.0))
            .count();
        Some(u32::try_from(ahead).map_or(u32::MAX, |n| n.saturating_add(1)))
    }

    /// Number of active entries waiting on a course.
    #[must_use]
    pub fn len(&self, course: &CourseId) -> usize {
        self.queue(course).lock().active_count()
    }

    /// Whether a course has no active entries.
    #[must_use]
    pub fn is_empty(&self, course: &CourseId) -> bool {
        self.len(course) == 0
    }
}

impl Default for WaitlistManager {
    fn default() -> Self {
        Self::new()
    }
}
