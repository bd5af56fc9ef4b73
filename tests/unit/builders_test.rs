//! Tests for engine construction

use std::sync::Arc;

use registrar_engine::builders::EngineBuilder;
use registrar_engine::config::EngineConfig;
use registrar_engine::infra::{
    AlwaysEligible, InMemoryCourseCatalog, InMemoryDirectory, InMemoryEnrollmentStore,
};
use registrar_engine::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_with_all_collaborators() {
    let engine = EngineBuilder::new(EngineConfig::default())
        .with_store(Arc::new(InMemoryEnrollmentStore::new()))
        .with_directory(Arc::new(InMemoryDirectory::new()))
        .with_capacity_provider(Arc::new(InMemoryCourseCatalog::new()))
        .with_oracle(Arc::new(AlwaysEligible))
        .with_spawner(TokioSpawner::current())
        .build();
    assert!(engine.is_ok());
    assert_eq!(engine.unwrap().dispatcher.listener_count(), 0);
}

#[tokio::test]
async fn test_build_requires_store() {
    let result = EngineBuilder::new(EngineConfig::default())
        .with_directory(Arc::new(InMemoryDirectory::new()))
        .with_capacity_provider(Arc::new(InMemoryCourseCatalog::new()))
        .with_spawner(TokioSpawner::current())
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_build_requires_valid_config() {
    let config = EngineConfig {
        batch_concurrency: 0,
        ..EngineConfig::default()
    };
    let result = EngineBuilder::new(config)
        .with_store(Arc::new(InMemoryEnrollmentStore::new()))
        .with_directory(Arc::new(InMemoryDirectory::new()))
        .with_capacity_provider(Arc::new(InMemoryCourseCatalog::new()))
        .with_spawner(TokioSpawner::current())
        .build();
    assert!(result.is_err());
}

#[test]
fn test_build_requires_spawner() {
    let result = EngineBuilder::<TokioSpawner>::new(EngineConfig::default())
        .with_store(Arc::new(InMemoryEnrollmentStore::new()))
        .with_directory(Arc::new(InMemoryDirectory::new()))
        .with_capacity_provider(Arc::new(InMemoryCourseCatalog::new()))
        .build();
    assert!(result.is_err());
}
