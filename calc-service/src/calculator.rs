// Calculator
// Entry point evaluating single expressions and batches with the configured executor

use crate::config::ExecutorConfig;
use crate::error::ExecResult;
use crate::execution::events::ProgressSender;
use crate::execution::graph::Expression;
use crate::execution::{build_executor, Executor};
use crate::expression::evaluator::{ArithmeticEvaluator, Evaluator, Variables};

use std::sync::Arc;

/// Batch calculator over integer assignment statements
pub struct Calculator {
    executor: Box<dyn Executor>,
}

impl Calculator {
    /// Create a calculator using the built-in arithmetic evaluator
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_evaluator(config, Arc::new(ArithmeticEvaluator::new()))
    }

    /// Create a calculator with a custom evaluator
    pub fn with_evaluator(config: ExecutorConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            executor: build_executor(config, evaluator, None),
        }
    }

    /// Create a calculator reporting progress on `tx`
    pub fn with_progress(config: ExecutorConfig, tx: ProgressSender) -> Self {
        Self {
            executor: build_executor(config, Arc::new(ArithmeticEvaluator::new()), Some(tx)),
        }
    }

    /// Underlying executor
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Evaluate one expression on an empty state, returning the value of its
    /// target
    pub async fn evaluate(&self, expression: &str) -> ExecResult<Option<i64>> {
        let target = Expression::parse(0, expression)?.target;
        let variables = self.evaluate_multiple(&[expression.to_string()]).await?;
        Ok(variables.get(&target).copied())
    }

    /// Evaluate a batch, handling dependencies between its expressions
    pub async fn evaluate_multiple(&self, expressions: &[String]) -> ExecResult<Variables> {
        self.executor.execute(expressions).await
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
