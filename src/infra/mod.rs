//! In-memory implementations of the engine's persistence and lookup seams.

pub mod catalog;
pub mod directory;
pub mod oracles;
pub mod store;

pub use catalog::InMemoryCourseCatalog;
pub use directory::InMemoryDirectory;
pub use oracles::{AlwaysEligible, EnrollmentWindow, StaticVerdicts};
pub use store::InMemoryEnrollmentStore;
