use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while building or loading the ranking artifacts.
///
/// Query-time edge cases (unknown terms, empty queries, flat score ranges)
/// are not represented here: they produce empty or constant output instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot build over an empty corpus")]
    EmptyCorpus,

    #[error("missing {name} artifact at {path:?}: {source}")]
    MissingArtifact { name: &'static str, path: PathBuf, source: std::io::Error },

    #[error("corrupt {name} artifact at {path:?}: {source}")]
    CorruptArtifact { name: &'static str, path: PathBuf, source: serde_json::Error },

    #[error("inconsistent artifacts: {0}")]
    InconsistentArtifacts(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
