//! Run-level error types
//!
//! File-local problems (unreadable files, syntax errors, detector panics) are
//! never errors at this level: they become reserved-rule findings. The types
//! here stop a run before or while it starts.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown rule '{0}' (run `smellscan rules` for the list)")]
    UnknownRule(String),

    #[error("Rule '{0}' reports analysis failures and cannot be disabled")]
    ReservedRule(String),

    #[error("Invalid severity '{value}' for {context}: expected info, warning or error")]
    InvalidSeverity { context: String, value: String },

    #[error("Invalid option '{option}' for rule '{rule}': {message}")]
    InvalidOption {
        rule: String,
        option: String,
        message: String,
    },

    #[error("Invalid exclude pattern: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("Invalid output format '{0}': expected text, json or sarif")]
    InvalidFormat(String),

    #[error("Invalid worker count {0}: expected a value between 1 and 64")]
    InvalidWorkers(usize),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("No Java source files found under the given paths")]
    NoInputFiles,

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
