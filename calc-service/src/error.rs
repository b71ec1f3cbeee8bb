// Error Types
// Errors that abort a batch execution

use crate::execution::graph::GraphError;

use std::time::Duration;
use thiserror::Error;

/// Result alias for batch execution
pub type ExecResult<T> = Result<T, ExecutionError>;

/// Errors that can occur while executing a batch
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Malformed expression, undefined variable or cycle
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("evaluation of '{expression}' failed: {reason}")]
    Evaluation { expression: String, reason: String },

    #[error("level {level} timed out after {timeout:?} ({completed}/{expected} results)")]
    LevelTimeout {
        level: usize,
        timeout: Duration,
        completed: usize,
        expected: usize,
    },

    #[error("workers of level {level} stopped early: {message}")]
    WorkerFailure { level: usize, message: String },
}

impl ExecutionError {
    pub fn evaluation(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was found before anything was evaluated
    pub fn is_graph_error(&self) -> bool {
        matches!(self, Self::Graph(_))
    }
}
