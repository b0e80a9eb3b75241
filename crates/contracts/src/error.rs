//! Layered error definitions
//!
//! Categorized by source: config / simulator / spawn / persistence

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum HarvestError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Simulator Errors =====
    /// Connection to the simulator failed or was dropped
    #[error("simulator connection error: {message}")]
    Connection { message: String },

    /// A synchronous world step failed or timed out
    #[error("world step failed: {message}")]
    Step { message: String },

    /// Actor handle is stale or was never registered
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: u32 },

    // ===== Spawn Errors =====
    /// No valid placement found within the attempt cap
    #[error("spawn exhausted for '{what}' after {attempts} attempts")]
    SpawnExhausted { what: String, attempts: u32 },

    // ===== Persistence Errors =====
    /// Frame or metadata write failed.
    ///
    /// Always fatal: skipping a write would desynchronize the shared frame
    /// index across sensors and agents.
    #[error("persistence error at '{path}': {message}")]
    Persistence { path: PathBuf, message: String },

    // ===== General Errors =====
    /// Cancellation flag observed between ticks or retry iterations
    #[error("interrupted by shutdown request")]
    Interrupted,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl HarvestError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create simulator connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create world step error
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step {
            message: message.into(),
        }
    }

    /// Create spawn exhaustion error
    pub fn spawn_exhausted(what: impl Into<String>, attempts: u32) -> Self {
        Self::SpawnExhausted {
            what: what.into(),
            attempts,
        }
    }

    /// Create persistence error
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, HarvestError>;
