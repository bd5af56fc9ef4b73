//! Engine configuration structure.

use serde::{Deserialize, Serialize};

/// Tunables for the enrollment engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a cached capacity entry stays fresh before reloading from the
    /// catalog.
    pub capacity_refresh_secs: u64,
    /// Maximum in-flight requests per batch.
    pub batch_concurrency: usize,
    /// Store write attempts before a transient failure surfaces.
    pub store_retry_max_attempts: u32,
    /// Base backoff between store retries, in milliseconds.
    pub store_retry_backoff_ms: u64,
    /// Audit entries retained in memory before eviction.
    pub audit_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity_refresh_secs: 30,
            batch_concurrency: 16,
            store_retry_max_attempts: 3,
            store_retry_backoff_ms: 50,
            audit_buffer_size: 10_000,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity_refresh_secs == 0 {
            return Err("capacity_refresh_secs must be greater than 0".into());
        }
        if self.batch_concurrency == 0 {
            return Err("batch_concurrency must be greater than 0".into());
        }
        if self.store_retry_max_attempts == 0 {
            return Err("store_retry_max_attempts must be greater than 0".into());
        }
        if self.audit_buffer_size == 0 {
            return Err("audit_buffer_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// A message describing the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `REGISTRAR_*` environment variables, falling
    /// back to defaults for anything unset. Loads `.env` first if present.
    ///
    /// # Errors
    ///
    /// A message naming the unparseable variable, or a validation failure.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("REGISTRAR_CAPACITY_REFRESH_SECS") {
            cfg.capacity_refresh_secs = v
                .parse()
                .map_err(|e| format!("REGISTRAR_CAPACITY_REFRESH_SECS: {e}"))?;
        }
        if let Ok(v) = std::env::var("REGISTRAR_BATCH_CONCURRENCY") {
            cfg.batch_concurrency = v
                .parse()
                .map_err(|e| format!("REGISTRAR_BATCH_CONCURRENCY: {e}"))?;
        }
        if let Ok(v) = std::env::var("REGISTRAR_STORE_RETRY_MAX_ATTEMPTS") {
            cfg.store_retry_max_attempts = v
                .parse()
                .map_err(|e| format!("REGISTRAR_STORE_RETRY_MAX_ATTEMPTS: {e}"))?;
        }
        if let Ok(v) = std::env::var("REGISTRAR_STORE_RETRY_BACKOFF_MS") {
            cfg.store_retry_backoff_ms = v
                .parse()
                .map_err(|e| format!("REGISTRAR_STORE_RETRY_BACKOFF_MS: {e}"))?;
        }
        if let Ok(v) = std::env::var("REGISTRAR_AUDIT_BUFFER_SIZE") {
            cfg.audit_buffer_size = v
                .parse()
                .map_err(|e| format!("REGISTRAR_AUDIT_BUFFER_SIZE: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
