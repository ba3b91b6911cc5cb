use std::path::PathBuf;
use thiserror::Error;

use crate::types::VertexId;

/// Every way a local clustering run can fail.
///
/// None of these are retried: a run either completes over a consistent view of
/// the adjacency source or aborts with one of the diagnostics below.
#[derive(Debug, Error)]
pub enum LocalClusterError {
    /// Invalid or missing run parameters, detected before the core starts.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The adjacency source could not be opened or read.
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    /// A line of the adjacency source could not be parsed.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        line: u64,
        reason: String,
    },

    /// A vertex needed by the sweep has never been resolved.
    #[error("Vertex {0:?} has rank but no resolved adjacency")]
    Unresolved(VertexId),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, LocalClusterError>;

impl LocalClusterError {
    /// Wraps an IO error together with the path it happened on.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LocalClusterError::Io {
            source,
            path: path.into(),
        }
    }
}
