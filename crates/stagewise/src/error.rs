//! Engine-level error types.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors produced by the workflow engine (build-time validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two stages were registered under the same name.
    #[error("duplicate stage: '{0}'")]
    DuplicateStage(String),

    /// A stage depends on a name that was never registered.
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency {
        stage: String,
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// Closed walk witnessing the cycle; first and last entries match.
        cycle: Vec<String>,
    },

    // ------ Execution errors ------

    /// A stage's action returned an error; the remaining stages were skipped.
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// Writing a rendered diagram to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a graph view failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable numeric code for this error kind.
    ///
    /// Build errors are numbered from 10001, run errors from 20001 and
    /// everything else from 30001.
    pub fn code(&self) -> u32 {
        match self {
            EngineError::DuplicateStage(_) => 10001,
            EngineError::CircularDependency { .. } => 10002,
            EngineError::UnknownDependency { .. } => 10003,
            EngineError::StageFailed { .. } => 20001,
            EngineError::Io(_) => 30001,
            EngineError::Serialization(_) => 30002,
        }
    }

    /// True for errors raised by [`crate::WorkflowBuilder`] before anything runs.
    pub fn is_build_error(&self) -> bool {
        (10001..20001).contains(&self.code())
    }

    /// Name of the stage whose action failed, if this is an execution error.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            EngineError::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
