//! Credit-weighted grade statistics over completed enrollments.
//!
//! Grades are fixed-point milli-grade-points (4000 = 4.0) so aggregation is
//! pure integer arithmetic. Aggregation runs over a point-in-time snapshot
//! from the store; large snapshots are folded in parallel with scoped worker
//! threads and merged over a channel.

use std::sync::Arc;

use tracing::debug;

use crate::core::coordinator::{EnrollmentStore, SnapshotFilter};
use crate::core::error::EnrollmentError;
use crate::domain::{CourseId, EnrollmentRecord, StudentId};

/// Minimum passing grade, 1.0 in milli-grade-points.
pub const PASS_THRESHOLD_MILLIS: u32 = 1000;

/// Records below this count are folded serially; threading overhead
/// dominates for small snapshots.
#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 256;

/// Letter-bucket counts for one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeDistribution {
    /// Grades at or above 3.5.
    pub a: u64,
    /// Grades in [2.5, 3.5).
    pub b: u64,
    /// Grades in [1.5, 2.5).
    pub c: u64,
    /// Grades in [1.0, 1.5).
    pub d: u64,
    /// Grades below 1.0.
    pub f: u64,
}

impl GradeDistribution {
    fn bump(&mut self, grade_millis: u32) {
        match grade_millis {
            3500.. => self.a += 1,
            2500..=3499 => self.b += 1,
            1500..=2499 => self.c += 1,
            1000..=1499 => self.d += 1,
            _ => self.f += 1,
        }
    }
}

/// Aggregated statistics over a set of completed enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeStatistics {
    /// Completed records considered, graded or not.
    pub completed: u64,
    /// Credit-weighted mean in milli-grade-points, rounded half-up.
    /// `None` when no graded credits exist.
    pub gpa_millis: Option<u64>,
    /// Share of graded records at or above the pass threshold, in basis
    /// points. `None` when no records carry a grade.
    pub pass_rate_bp: Option<u32>,
    /// Letter-bucket counts over graded records.
    pub distribution: GradeDistribution,
}

/// Commutative partial fold, mergeable across workers.
#[derive(Debug, Default)]
struct Partial {
    quality_points: u128,
    credits: u64,
    completed: u64,
    graded: u64,
    passed: u64,
    distribution: GradeDistribution,
}

impl Partial {
    fn absorb(&mut self, record: &EnrollmentRecord) {
        self.completed += 1;
        let Some(grade) = record.grade_millis else {
            return;
        };
        self.graded += 1;
        self.quality_points += u128::from(grade) * u128::from(record.credits);
        self.credits += u64::from(record.credits);
        if grade >= PASS_THRESHOLD_MILLIS {
            self.passed += 1;
        }
        self.distribution.bump(grade);
    }

    fn merge(&mut self, other: Self) {
        self.quality_points += other.quality_points;
        self.credits += other.credits;
        self.completed += other.completed;
        self.graded += other.graded;
        self.passed += other.passed;
        self.distribution.a += other.distribution.a;
        self.distribution.b += other.distribution.b;
        self.distribution.c += other.distribution.c;
        self.distribution.d += other.distribution.d;
        self.distribution.f += other.distribution.f;
    }

    fn finish(self) -> GradeStatistics {
        let gpa_millis = if self.credits == 0 {
            None
        } else {
            // Half-up integer rounding.
            let rounded =
                (self.quality_points + u128::from(self.credits) / 2) / u128::from(self.credits);
            Some(u64::try_from(rounded).unwrap_or(u64::MAX))
        };
        let pass_rate_bp = if self.graded == 0 {
            None
        } else {
            let bp = (self.passed * 10_000 + self.graded / 2) / self.graded;
            Some(u32::try_from(bp).unwrap_or(u32::MAX))
        };
        GradeStatistics {
            completed: self.completed,
            gpa_millis,
            pass_rate_bp,
            distribution: self.distribution,
        }
    }
}

/// Computes grade statistics from the store's completed-enrollment snapshots.
pub struct GradeAggregator {
    store: Arc<dyn EnrollmentStore>,
    workers: usize,
}

impl GradeAggregator {
    /// Create an aggregator that folds large snapshots across `workers`
    /// threads. A worker count of zero or one disables the parallel path.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>, workers: usize) -> Self {
        Self { store, workers }
    }

    /// Create an aggregator sized to the host's logical CPUs.
    #[must_use]
    pub fn with_default_workers(store: Arc<dyn EnrollmentStore>) -> Self {
        Self::new(store, num_cpus::get())
    }

    /// Statistics over every completed enrollment in one course.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the snapshot read.
    pub fn course_statistics(&self, course: &CourseId) -> Result<GradeStatistics, EnrollmentError> {
        let filter = SnapshotFilter {
            course: Some(course.clone()),
            ..SnapshotFilter::default()
        };
        let records = self.store.completed_snapshot(&filter)?;
        Ok(self.fold(&records))
    }

    /// Statistics over one student's completed enrollments; `gpa_millis` is
    /// the student's credit-weighted GPA across everything they finished.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the snapshot read.
    pub fn student_gpa(&self, student: &StudentId) -> Result<GradeStatistics, EnrollmentError> {
        let filter = SnapshotFilter {
            student: Some(student.clone()),
            ..SnapshotFilter::default()
        };
        let records = self.store.completed_snapshot(&filter)?;
        Ok(self.fold(&records))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn fold(&self, records: &[EnrollmentRecord]) -> GradeStatistics {
        if self.workers <= 1 || records.len() < PARALLEL_THRESHOLD {
            return fold_serial(records);
        }
        let chunk_size = records.len().div_ceil(self.workers);
        let (tx, rx) = crossbeam_channel::unbounded::<Partial>();
        std::thread::scope(|scope| {
            for chunk in records.chunks(chunk_size) {
                let tx = tx.clone();
                scope.spawn(move || {
                    let mut partial = Partial::default();
                    for record in chunk {
                        partial.absorb(record);
                    }
                    // Receiver outlives the scope; send cannot fail.
                    let _ = tx.send(partial);
                });
            }
        });
        drop(tx);
        let mut total = Partial::default();
        for partial in rx {
            total.merge(partial);
        }
        debug!(records = records.len(), workers = self.workers, "parallel grade fold");
        total.finish()
    }

    #[cfg(target_arch = "wasm32")]
    fn fold(&self, records: &[EnrollmentRecord]) -> GradeStatistics {
        fold_serial(records)
    }
}

fn fold_serial(records: &[EnrollmentRecord]) -> GradeStatistics {
    let mut partial = Partial::default();
    for record in records {
        partial.absorb(record);
    }
    partial.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnrollmentStatus, Semester, Term};
    use uuid::Uuid;

    fn completed(student: &str, course: &str, credits: u32, grade: Option<u32>) -> EnrollmentRecord {
        let mut record = EnrollmentRecord::new(
            StudentId::from(student),
            CourseId::from(course),
            Term::new(Semester::Fall, 2026),
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
    fn weighted_gpa_rounds_half_up() {
        // 4 credits of 4.0 plus 3 credits of 3.0: 25000/7 = 3571.43 -> 3571.
        let records = vec![
            completed("s1", "MATH-1", 4, Some(4000)),
            completed("s1", "HIST-1", 3, Some(3000)),
        ];
        let stats = fold_serial(&records);
        assert_eq!(stats.gpa_millis, Some(3571));
        assert_eq!(stats.completed, 2);
    }

    #[test]
    fn ungraded_records_count_but_do_not_weigh() {
        let records = vec![
            completed("s1", "MATH-1", 3, Some(2000)),
            completed("s1", "PE-1", 1, None),
        ];
        let stats = fold_serial(&records);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.gpa_millis, Some(2000));
        assert_eq!(stats.pass_rate_bp, Some(10_000));
    }

    #[test]
    fn empty_snapshot_yields_no_gpa() {
        let stats = fold_serial(&[]);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.gpa_millis, None);
        assert_eq!(stats.pass_rate_bp, None);
    }

    #[test]
    fn pass_rate_and_distribution() {
        let records = vec![
            completed("s1", "C1", 3, Some(3800)), // a, pass
            completed("s2", "C1", 3, Some(2700)), // b, pass
            completed("s3", "C1", 3, Some(1200)), // d, pass
            completed("s4", "C1", 3, Some(700)),  // f, fail
        ];
        let stats = fold_serial(&records);
        assert_eq!(stats.pass_rate_bp, Some(7500));
        assert_eq!(
            stats.distribution,
            GradeDistribution {
                a: 1,
                b: 1,
                c: 0,
                d: 1,
                f: 1
            }
        );
    }

    #[test]
    fn parallel_fold_matches_serial() {
        let records: Vec<_> = (0..1000)
            .map(|i| {
                completed(
                    &format!("s{i}"),
                    "BIG-1",
                    3,
                    Some(u32::try_from(i % 4001).unwrap()),
                )
            })
            .collect();
        let store: Arc<dyn EnrollmentStore> = Arc::new(crate::infra::InMemoryEnrollmentStore::new());
        let aggregator = GradeAggregator::new(store, 4);
        assert_eq!(aggregator.fold(&records), fold_serial(&records));
    }
}
