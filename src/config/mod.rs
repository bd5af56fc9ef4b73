//! Configuration models for the enrollment engine.

pub mod engine;

pub use engine::EngineConfig;
