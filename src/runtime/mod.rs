//! Runtime adapters for spawning background work.

pub mod tokio_spawner;

use std::future::Future;

pub use tokio_spawner::TokioSpawner;

/// Abstraction for spawning async work on a runtime. The dispatcher uses it
/// for asynchronous listener delivery so the engine stays decoupled from one
/// executor.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn an async task that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
