//! Core error types for forest-core.
//!
//! Mirrors the failure taxonomy the service surface reports: input errors,
//! missing entities, and persistence failures abort an operation. Time parse
//! failures are recoverable and live in [`crate::time::TimeParseError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for forest-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or malformed caller input
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// A referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Persistence layer refused a read or write
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Entity kinds that can be reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Frontier,
    Task,
    Block,
    Schedule,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntityKind::Project => "Project",
            EntityKind::Frontier => "HTA frontier",
            EntityKind::Task => "Task",
            EntityKind::Block => "Time block",
            EntityKind::Schedule => "Schedule",
        };
        f.write_str(label)
    }
}

/// Caller input errors. Surfaced immediately; nothing is written.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field is present but unusable
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Difficulty rating outside 1-5
    #[error("Difficulty rating must be between 1 and 5, got {0}")]
    DifficultyOutOfRange(u8),
}

/// Persistence failures. Always hard errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to read a stored document
    #[error("Failed to load {what} from {path}: {message}")]
    LoadFailed {
        what: String,
        path: PathBuf,
        message: String,
    },

    /// Failed to write a document
    #[error("Failed to save {what} to {path}: {message}")]
    SaveFailed {
        what: String,
        path: PathBuf,
        message: String,
    },

    /// Store rejected a write without a path (e.g. in-memory store)
    #[error("Store rejected write of {0}")]
    Rejected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory could not be determined
    #[error("Cannot determine data directory")]
    NoDataDir,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_kind_and_id() {
        let err = CoreError::not_found(EntityKind::Task, "node-42");
        assert_eq!(err.to_string(), "Task not found: node-42");
    }

    #[test]
    fn input_error_converts_into_core_error() {
        let err: CoreError = InputError::MissingField("wake_time".into()).into();
        assert!(matches!(err, CoreError::Input(InputError::MissingField(_))));
        assert!(err.to_string().contains("wake_time"));
    }
}
