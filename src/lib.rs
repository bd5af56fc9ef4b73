//! # Registrar Engine
//!
//! A concurrent enrollment and waitlist engine for academic-records backends.
//!
//! The engine sits between request handlers and the student-records store and
//! owns every seat-accounting decision during registration windows. It keeps
//! course capacity honest under concurrency, runs ordered waitlists with
//! automatic promotion, and leaves an audit trail behind every transition.
//!
//! ## Core Problem Solved
//!
//! Registration traffic is bursty and adversarial to naive seat accounting:
//!
//! - **Capacity Races**: Hundreds of students hit the last seats of a popular
//!   course within the same second
//! - **Fairness**: Waitlist order must be deterministic - priority tier first,
//!   then arrival order - and survive cancellations
//! - **Compound Actions**: A transfer must never strand a student with no
//!   enrollment when the target course rejects them
//! - **Accountability**: Every enrollment decision needs an audit record and
//!   downstream notification
//!
//! ## Key Features
//!
//! - **Atomic Seat Accounting**: Lock-free check-and-increment per course;
//!   a full course waitlists the loser instead of rejecting it
//! - **Ordered Waitlists**: Priority-then-FIFO queues with lazy cancellation
//!   and precondition re-checks at promotion time
//! - **Transfer Compensation**: Failed transfers re-enroll the student into
//!   the source course, or re-waitlist them at high priority
//! - **Event Pipeline**: Priority-ordered listeners with per-listener
//!   isolation, timeouts, and cancellation hooks
//! - **Bulk Operations**: Semaphore-bounded batch enroll/drop with cooperative
//!   cancellation and exact per-input accounting
//! - **Grade Aggregation**: Credit-weighted, fixed-point GPA and pass-rate
//!   statistics folded in parallel over store snapshots
//!
//! ```rust,ignore
//! use registrar_engine::builders::EngineBuilder;
//! use registrar_engine::config::EngineConfig;
//! use registrar_engine::core::Actor;
//! use registrar_engine::domain::{CourseId, Semester, StudentId, Term};
//! use registrar_engine::runtime::TokioSpawner;
//!
//! let engine = EngineBuilder::new(EngineConfig::default())
//!     .with_store(store)
//!     .with_directory(directory)
//!     .with_capacity_provider(catalog)
//!     .with_spawner(TokioSpawner::current())
//!     .build()?;
//!
//! let record = engine
//!     .coordinator
//!     .request_enrollment(
//!         StudentId::from("S-1001"),
//!         CourseId::from("CS-101"),
//!         Term::new(Semester::Fall, 2026),
//!         Actor::System,
//!     )
//!     .await?;
//! ```
//!
//! For complete examples, see:
//! - `tests/enrollment_flow_test.rs` - Full lifecycle integration tests
//! - `tests/concurrency_test.rs` - Capacity behavior under contention

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders assembling engine components from configuration.
pub mod builders;
/// Configuration models for the enrollment engine.
pub mod config;
/// Core engine: coordination, capacity, waitlists, grades, batches, audit.
pub mod core;
/// Identifier newtypes, terms, and the enrollment record model.
pub mod domain;
/// Event records, listeners, and the notification dispatcher.
pub mod events;
/// In-memory implementations of the engine's persistence and lookup seams.
pub mod infra;
/// Runtime adapters for spawning background work.
pub mod runtime;
/// Shared utilities.
pub mod util;
