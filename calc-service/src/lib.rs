// Calc Service Library
// Dependency-aware batch evaluation of integer assignment expressions

pub mod batch;
pub mod calculator;
pub mod config;
pub mod error;
pub mod execution;
pub mod expression;

// Re-export commonly used types
pub use batch::{parse_batch, read_batch};
pub use calculator::Calculator;
pub use config::{ConfigError, ExecutionStrategy, ExecutorConfig};
pub use error::{ExecResult, ExecutionError};

// Re-export expression types
pub use expression::{ArithmeticEvaluator, EvalError, Evaluator, Variables};

// Re-export execution types
pub use execution::{
    build_executor, extract, levels, plan, progress_channel, DependencyGraph, EventSender,
    ExecutionEvent, Executor, Expression, GraphError, GraphErrorKind, Level, LeveledExecutor,
    ProgressReceiver, ProgressSender, SequentialExecutor,
};
