//! Typed failure taxonomy for component boundaries.
//!
//! Every collaborator converts its failures into one of these values before
//! returning. Raw errors never cross into the orchestration loop; the tool
//! dispatch layer flattens them into tool-result payloads instead.

use std::path::PathBuf;

use thiserror::Error;

/// Query execution failure, recovered at the executor boundary.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Malformed SQL rejected by the engine during prepare.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Execution exceeded `max_execution_time`; partial results are discarded.
    #[error("query cancelled after exceeding max_execution_time of {0}s")]
    Timeout(u64),
    /// The database could not be opened or reached.
    #[error("connection error: {0}")]
    Connection(String),
    /// Any other engine-reported failure.
    #[error("{0}")]
    Other(String),
}

/// Schema introspection failure carrying the backend name and the underlying
/// message. Introspection is atomic: on error no partial description escapes.
#[derive(Debug, Error)]
#[error("schema introspection failed for {backend} backend: {message}")]
pub struct SchemaError {
    /// Backend tag (`sqlite`, `documents`).
    pub backend: &'static str,
    /// Underlying engine or I/O message.
    pub message: String,
}

impl SchemaError {
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}

/// Data dictionary lookup failure.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("dictionary file {path} has no column named `{column}`")]
    MissingColumn { path: PathBuf, column: String },
}

/// Fatal startup configuration problem; not recoverable by the core.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
}
