// crates/todflow-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by [`crate::store::DataStore`] lookups.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no artifact stored under key '{key}'")]
    MissingKey { key: String },

    #[error("artifact under key '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Failures loading or resolving a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read unit list {path}: {source}")]
    UnitFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid unit glob '{pattern}': {source}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to expand unit glob '{pattern}': {source}")]
    GlobWalk {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },

    #[error("unit range {start}..{end} is out of bounds for a catalog of {len}")]
    UnitRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("config declares no unit source (expected units.list, units.file, or units.glob)")]
    NoUnitSource,

    #[error("config declares more than one unit source")]
    AmbiguousUnitSource,
}

/// Failures that end a pipeline run.
///
/// A veto is deliberately not representable here: vetoes are ordinary
/// control flow and never travel the error channel.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("routine '{routine}' failed to initialize: {cause}")]
    Initialize {
        routine: String,
        cause: anyhow::Error,
    },

    #[error("routine '{routine}' failed on unit '{unit}': {cause}")]
    Execute {
        routine: String,
        unit: String,
        cause: anyhow::Error,
    },

    #[error("routine '{routine}' failed to finalize: {cause}")]
    Finalize {
        routine: String,
        cause: anyhow::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
