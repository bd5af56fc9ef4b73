//! Tests for configuration validation

use registrar_engine::config::EngineConfig;

#[test]
fn test_default_config_is_valid() {
    assert!(EngineConfig::default().validate().is_ok());
}

#[test]
fn test_zero_refresh_rejected() {
    let cfg = EngineConfig {
        capacity_refresh_secs: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_concurrency_rejected() {
    let cfg = EngineConfig {
        batch_concurrency: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_retry_attempts_rejected() {
    let cfg = EngineConfig {
        store_retry_max_attempts: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = EngineConfig::from_json_str(
        r#"{
            "capacity_refresh_secs": 10,
            "batch_concurrency": 8,
            "store_retry_max_attempts": 5,
            "store_retry_backoff_ms": 25,
            "audit_buffer_size": 500
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.capacity_refresh_secs, 10);
    assert_eq!(cfg.batch_concurrency, 8);
    assert_eq!(cfg.store_retry_max_attempts, 5);
}

#[test]
fn test_from_json_str_rejects_invalid_values() {
    let result = EngineConfig::from_json_str(
        r#"{
            "capacity_refresh_secs": 0,
            "batch_concurrency": 8,
            "store_retry_max_attempts": 5,
            "store_retry_backoff_ms": 25,
            "audit_buffer_size": 500
        }"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_from_json_str_rejects_malformed_input() {
    assert!(EngineConfig::from_json_str("not json").is_err());
}
