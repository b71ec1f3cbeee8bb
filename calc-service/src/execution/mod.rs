// Execution Engine Module
// Dependency analysis, level planning and the batch executors

pub mod events;
pub mod executor;
pub mod extract;
pub mod graph;
pub mod planner;
pub mod sequential;

// Re-export key types
pub use events::{progress_channel, EventSender, ExecutionEvent, ProgressReceiver, ProgressSender};
pub use executor::LeveledExecutor;
pub use extract::extract;
pub use graph::{DependencyGraph, Expression, GraphError, GraphErrorKind};
pub use planner::{levels, Level};
pub use sequential::SequentialExecutor;

use crate::config::{ExecutionStrategy, ExecutorConfig};
use crate::error::ExecResult;
use crate::expression::evaluator::{Evaluator, Variables};

use std::sync::Arc;

/// Trait for batch executors
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Strategy this executor implements
    fn strategy(&self) -> ExecutionStrategy;

    /// Evaluate the batch and return the final variable mapping
    async fn execute(&self, batch: &[String]) -> ExecResult<Variables>;
}

/// Build the executor selected by `config.strategy`
pub fn build_executor(
    config: ExecutorConfig,
    evaluator: Arc<dyn Evaluator>,
    progress: Option<ProgressSender>,
) -> Box<dyn Executor> {
    match config.strategy {
        ExecutionStrategy::Sequential => {
            let mut executor = SequentialExecutor::new(evaluator);
            if let Some(tx) = progress {
                executor = executor.with_progress(tx);
            }
            Box::new(executor)
        }
        ExecutionStrategy::Leveled => {
            let mut executor = LeveledExecutor::new(evaluator).with_config(config);
            if let Some(tx) = progress {
                executor = executor.with_progress(tx);
            }
            Box::new(executor)
        }
    }
}

/// Plan a batch into levels without evaluating anything
pub fn plan<S: AsRef<str>>(batch: &[S]) -> Result<Vec<Level>, GraphError> {
    let graph = DependencyGraph::build(batch)?;
    let order = graph.topological_order()?;
    Ok(levels(&order))
}
