//! Builder wiring an enrollment engine from configuration and collaborators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;

use crate::config::EngineConfig;
use crate::core::{
    AuditSink, BatchProcessor, CapacityCache, CapacityProvider, DirectoryService,
    EnrollmentCoordinator, EnrollmentStore, GradeAggregator, InMemoryAuditSink,
    PreconditionOracle, RetryPolicy,
};
use crate::core::error::AppResult;
use crate::events::NotificationDispatcher;
use crate::runtime::Spawn;

/// A fully wired engine: one coordinator plus the surfaces built around it.
pub struct EnrollmentEngine<S: Spawn> {
    /// Enrollment lifecycle operations.
    pub coordinator: Arc<EnrollmentCoordinator<S>>,
    /// Listener registration and publish metrics.
    pub dispatcher: Arc<NotificationDispatcher<S>>,
    /// Bounded-concurrency bulk operations.
    pub batch: BatchProcessor<S>,
    /// Grade statistics over completed enrollments.
    pub grades: GradeAggregator,
    /// Capacity counters, exposed for snapshots and admin invalidation.
    pub capacity: Arc<CapacityCache>,
}

/// Step-by-step construction of an [`EnrollmentEngine`].
pub struct EngineBuilder<S: Spawn> {
    config: EngineConfig,
    store: Option<Arc<dyn EnrollmentStore>>,
    directory: Option<Arc<dyn DirectoryService>>,
    oracles: Vec<Arc<dyn PreconditionOracle>>,
    capacity_provider: Option<Arc<dyn CapacityProvider>>,
    audit: Option<Arc<dyn AuditSink>>,
    spawner: Option<S>,
}

impl<S: Spawn> EngineBuilder<S> {
    /// Builder seeded with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            directory: None,
            oracles: Vec::new(),
            capacity_provider: None,
            audit: None,
            spawner: None,
        }
    }

    /// Set the enrollment store. Required.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn EnrollmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the student/course directory. Required.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryService>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Add a precondition oracle; oracles run in registration order.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn PreconditionOracle>) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Set the capacity system of record. Required.
    #[must_use]
    pub fn with_capacity_provider(mut self, provider: Arc<dyn CapacityProvider>) -> Self {
        self.capacity_provider = Some(provider);
        self
    }

    /// Set the audit sink. Defaults to a bounded in-memory sink sized by the
    /// configuration.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the spawner for asynchronous listener delivery. Required.
    #[must_use]
    pub fn with_spawner(mut self, spawner: S) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate the configuration and assemble the engine.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or a missing required collaborator.
    pub fn build(self) -> AppResult<EnrollmentEngine<S>> {
        if let Err(e) = self.config.validate() {
            bail!("config invalid: {e}");
        }
        let Some(store) = self.store else {
            bail!("an enrollment store is required");
        };
        let Some(directory) = self.directory else {
            bail!("a directory service is required");
        };
        let Some(provider) = self.capacity_provider else {
            bail!("a capacity provider is required");
        };
        let Some(spawner) = self.spawner else {
            bail!("a spawner is required");
        };
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(InMemoryAuditSink::new(self.config.audit_buffer_size)));

        let capacity = Arc::new(CapacityCache::new(
            provider,
            Duration::from_secs(self.config.capacity_refresh_secs),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(spawner));
        let coordinator = Arc::new(EnrollmentCoordinator::new(
            Arc::clone(&store),
            directory,
            self.oracles,
            Arc::clone(&capacity),
            Arc::new(crate::core::WaitlistManager::new()),
            audit,
            Arc::clone(&dispatcher),
            RetryPolicy {
                max_attempts: self.config.store_retry_max_attempts,
                backoff: Duration::from_millis(self.config.store_retry_backoff_ms),
            },
        ));
        let batch = BatchProcessor::new(Arc::clone(&coordinator), self.config.batch_concurrency);
        let grades = GradeAggregator::with_default_workers(store);

        Ok(EnrollmentEngine {
            coordinator,
            dispatcher,
            batch,
            grades,
            capacity,
        })
    }
}
