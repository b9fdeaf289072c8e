use morphevo_engine::RuntimeError;

use std::path::PathBuf;

/// Result type of every fallible experiment operation.
pub type Result<T> = std::result::Result<T, ExperimentError>;

/// Fatal errors of an experiment run.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    /// An input file is missing, unreadable or not decodable.
    #[error("failed to deserialize {}: {reason}", .path.display())]
    Deserialization { path: PathBuf, reason: String },

    /// A population decoded fine but breaks its own invariants.
    #[error("corrupt population state in {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// The requested options cannot be satisfied.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A generation produced no usable score.
    #[error("evaluation failed at iteration {iteration}: {reason}")]
    Evaluation { iteration: usize, reason: String },

    /// Results could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine runtime could not be acquired or could not spawn workers.
    #[error("engine runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl ExperimentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> ExperimentError {
        ExperimentError::Io {
            path: path.into(),
            source,
        }
    }
}
