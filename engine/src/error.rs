//! Error types for the simulation engine

use thiserror::Error;

/// Engine-level error
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scenario configuration is invalid or inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Geodata table could not be loaded or failed validation
    #[error("geodata error: {0}")]
    Geodata(String),

    /// Mobility matrix could not be loaded or failed validation
    #[error("mobility error: {0}")]
    Mobility(String),

    /// Seeding input could not be loaded or failed validation
    #[error("seeding error: {0}")]
    Seeding(String),

    /// Acceptance filter could not be loaded or failed validation
    #[error("filter error: {0}")]
    Filter(String),

    /// Every redraw of a realization was rejected by the acceptance filter
    #[error("realization {uid} rejected by the acceptance filter after {attempts} attempts")]
    FilterExhausted { uid: u64, attempts: u32 },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("summary encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trajectory encode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine-level result
pub type Result<T> = std::result::Result<T, EngineError>;
