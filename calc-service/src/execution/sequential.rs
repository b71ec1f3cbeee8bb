// Sequential Executor
// Evaluates a batch in input order on a single live state

use crate::config::ExecutionStrategy;
use crate::error::{ExecResult, ExecutionError};
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::execution::Executor;
use crate::expression::evaluator::{Evaluator, Variables};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Fallback executor: no graph, no pool, one expression after another.
///
/// Each expression sees every effect of the ones before it, including
/// increment side effects on variables other than its target.
pub struct SequentialExecutor {
    evaluator: Arc<dyn Evaluator>,
    event_tx: Option<ProgressSender>,
}

impl SequentialExecutor {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            evaluator,
            event_tx: None,
        }
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub async fn execute(&self, batch: &[String]) -> ExecResult<Variables> {
        let start = Instant::now();
        tracing::info!(expressions = batch.len(), "starting sequential execution");
        self.event_tx.send_event(ExecutionEvent::batch_started(
            ExecutionStrategy::Sequential,
            batch.len(),
            0,
        ));

        let mut variables = Variables::new();

        for expression in batch {
            match self
                .evaluator
                .evaluate_in_place(expression, &mut variables)
                .await
            {
                Ok((target, value)) => {
                    tracing::trace!(%expression, %target, value, "evaluated");
                    self.event_tx.send_event(ExecutionEvent::expression_evaluated(
                        0, expression, target, value,
                    ));
                }
                Err(err) => {
                    tracing::warn!(%expression, error = %err, "evaluation failed");
                    self.event_tx
                        .send_event(ExecutionEvent::batch_completed(false, 0, start.elapsed()));
                    return Err(ExecutionError::evaluation(expression, err.message));
                }
            }
        }

        self.event_tx.send_event(ExecutionEvent::batch_completed(
            true,
            variables.len(),
            start.elapsed(),
        ));

        Ok(variables)
    }
}

#[async_trait]
impl Executor for SequentialExecutor {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Sequential
    }

    async fn execute(&self, batch: &[String]) -> ExecResult<Variables> {
        SequentialExecutor::execute(self, batch).await
    }
}
