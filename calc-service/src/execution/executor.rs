// Leveled Executor
// Evaluates a batch level by level on a bounded worker pool

use crate::config::{ExecutionStrategy, ExecutorConfig};
use crate::error::{ExecResult, ExecutionError};
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::execution::graph::{DependencyGraph, Expression};
use crate::execution::planner::{self, Level};
use crate::execution::Executor;
use crate::expression::evaluator::{Evaluator, Variables};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Shared work queue of one level
type WorkQueue = Arc<StdMutex<VecDeque<Expression>>>;

/// Message a worker sends back to the driver
#[derive(Debug)]
enum WorkResult {
    Value {
        expression: String,
        target: String,
        value: i64,
    },
    Failed {
        expression: String,
        reason: String,
    },
}

/// Batch executor running each dependency level on its own worker pool.
///
/// Workers of a level read one immutable snapshot of the variable state and
/// only the driver writes to the state, after every result of the level has
/// arrived. A level never starts before the previous one is merged.
pub struct LeveledExecutor {
    /// Configuration
    config: ExecutorConfig,
    /// Evaluates single expressions
    evaluator: Arc<dyn Evaluator>,
    /// Progress event sender
    event_tx: Option<ProgressSender>,
}

impl LeveledExecutor {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            config: ExecutorConfig::default(),
            evaluator,
            event_tx: None,
        }
    }

    /// Set executor configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Execute the batch, returning the final variable state
    pub async fn execute(&self, batch: &[String]) -> ExecResult<Variables> {
        let start = Instant::now();

        let graph = DependencyGraph::build(batch)?;
        let order = graph.topological_order()?;
        let levels = planner::levels(&order);

        tracing::info!(
            expressions = batch.len(),
            levels = levels.len(),
            "starting leveled execution"
        );
        self.event_tx.send_event(ExecutionEvent::batch_started(
            ExecutionStrategy::Leveled,
            batch.len(),
            levels.len(),
        ));

        let state = Mutex::new(Variables::new());

        for level in &levels {
            if let Err(err) = self.run_level(level, &state).await {
                tracing::warn!(level = level.index, error = %err, "level failed");
                self.event_tx
                    .send_event(ExecutionEvent::level_failed(level.index, err.to_string()));
                self.event_tx
                    .send_event(ExecutionEvent::batch_completed(false, 0, start.elapsed()));
                return Err(err);
            }
        }

        let variables = state.into_inner();
        self.event_tx.send_event(ExecutionEvent::batch_completed(
            true,
            variables.len(),
            start.elapsed(),
        ));

        Ok(variables)
    }

    /// Evaluate one level and merge its results into `state`
    async fn run_level(&self, level: &Level, state: &Mutex<Variables>) -> ExecResult<()> {
        let start = Instant::now();
        let expected = level.len();
        let workers = self.config.worker_limit().min(expected).max(1);

        let snapshot = Arc::new(state.lock().await.clone());
        let queue: WorkQueue =
            Arc::new(StdMutex::new(level.expressions.iter().cloned().collect()));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        tracing::debug!(level = level.index, expected, workers, "starting level");
        self.event_tx
            .send_event(ExecutionEvent::level_started(level.index, expected, workers));

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(work(
                worker,
                Arc::clone(&self.evaluator),
                Arc::clone(&queue),
                Arc::clone(&snapshot),
                result_tx.clone(),
            ));
        }
        // Only workers hold senders, so the channel closes once they all exit
        drop(result_tx);

        let collected = self.collect(level, &mut result_rx).await;
        if collected.is_err() {
            lock_queue(&queue).clear();
        }

        self.shutdown(level.index, pool).await;

        let results = collected?;

        let mut state = state.lock().await;
        for (target, value) in results {
            state.insert(target, value);
        }

        tracing::debug!(level = level.index, elapsed = ?start.elapsed(), "level merged");
        self.event_tx
            .send_event(ExecutionEvent::level_completed(level.index, start.elapsed()));

        Ok(())
    }

    /// Wait for every result of the level, or the first error
    async fn collect(
        &self,
        level: &Level,
        rx: &mut mpsc::UnboundedReceiver<WorkResult>,
    ) -> ExecResult<Vec<(String, i64)>> {
        let expected = level.len();
        let mut results = Vec::with_capacity(expected);

        while results.len() < expected {
            match timeout(self.config.level_timeout, rx.recv()).await {
                Ok(Some(WorkResult::Value {
                    expression,
                    target,
                    value,
                })) => {
                    tracing::trace!(level = level.index, %target, value, "result ready");
                    self.event_tx.send_event(ExecutionEvent::expression_evaluated(
                        level.index,
                        expression,
                        target.clone(),
                        value,
                    ));
                    results.push((target, value));
                }
                Ok(Some(WorkResult::Failed { expression, reason })) => {
                    return Err(ExecutionError::evaluation(expression, reason));
                }
                Ok(None) => {
                    return Err(ExecutionError::WorkerFailure {
                        level: level.index,
                        message: format!(
                            "all workers exited after {} of {} results",
                            results.len(),
                            expected
                        ),
                    });
                }
                Err(_) => {
                    return Err(ExecutionError::LevelTimeout {
                        level: level.index,
                        timeout: self.config.level_timeout,
                        completed: results.len(),
                        expected,
                    });
                }
            }
        }

        Ok(results)
    }

    /// Give workers the grace period to exit, then abort and detach the rest
    async fn shutdown(&self, level: usize, mut pool: JoinSet<()>) {
        let grace = self.config.grace_period;

        let joined = timeout(grace, async {
            while let Some(joined) = pool.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        tracing::warn!(level, "worker panicked");
                    }
                }
            }
        })
        .await;

        if joined.is_err() {
            tracing::warn!(
                level,
                remaining = pool.len(),
                ?grace,
                "workers still running after grace period, aborting"
            );
            // Tasks blocked outside an await point never observe the abort
            pool.abort_all();
            pool.detach_all();
        }
    }
}

#[async_trait]
impl Executor for LeveledExecutor {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Leveled
    }

    async fn execute(&self, batch: &[String]) -> ExecResult<Variables> {
        LeveledExecutor::execute(self, batch).await
    }
}

/// Worker loop: pop expressions until the queue is empty or one fails
async fn work(
    worker: usize,
    evaluator: Arc<dyn Evaluator>,
    queue: WorkQueue,
    snapshot: Arc<Variables>,
    results: mpsc::UnboundedSender<WorkResult>,
) {
    while let Some(expression) = next_expression(&queue) {
        tracing::trace!(worker, expression = %expression.source, "evaluating");

        match evaluator.evaluate(&expression.source, &snapshot).await {
            Ok((target, value)) => {
                let sent = results.send(WorkResult::Value {
                    expression: expression.source,
                    target,
                    value,
                });
                if sent.is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(
                    worker,
                    expression = %expression.source,
                    error = %err,
                    "evaluation failed"
                );
                let _ = results.send(WorkResult::Failed {
                    expression: expression.source,
                    reason: err.message,
                });
                break;
            }
        }
    }
}

fn next_expression(queue: &StdMutex<VecDeque<Expression>>) -> Option<Expression> {
    lock_queue(queue).pop_front()
}

/// Acquire the queue lock, recovering from a poisoned state
fn lock_queue(queue: &StdMutex<VecDeque<Expression>>) -> MutexGuard<'_, VecDeque<Expression>> {
    queue.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("work queue mutex poisoned, recovering");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::progress_channel;
    use crate::expression::evaluator::{ArithmeticEvaluator, EvalError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn batch(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn vars(pairs: &[(&str, i64)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn executor() -> LeveledExecutor {
        LeveledExecutor::new(Arc::new(ArithmeticEvaluator::new()))
    }

    /// Evaluator that tracks how many evaluations run at once
    struct Tracking {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Evaluator for Tracking {
        async fn evaluate(
            &self,
            expression: &str,
            variables: &Variables,
        ) -> Result<(String, i64), EvalError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let result = ArithmeticEvaluator.evaluate(expression, variables).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    /// Evaluator that never answers
    struct Stuck;

    #[async_trait]
    impl Evaluator for Stuck {
        async fn evaluate(
            &self,
            _expression: &str,
            _variables: &Variables,
        ) -> Result<(String, i64), EvalError> {
            std::future::pending().await
        }
    }

    /// Evaluator that blocks its thread instead of yielding
    struct Blocking(Duration);

    #[async_trait]
    impl Evaluator for Blocking {
        async fn evaluate(
            &self,
            expression: &str,
            variables: &Variables,
        ) -> Result<(String, i64), EvalError> {
            std::thread::sleep(self.0);
            ArithmeticEvaluator.evaluate(expression, variables).await
        }
    }

    /// Evaluator that panics on one expression
    struct Panicking(&'static str);

    #[async_trait]
    impl Evaluator for Panicking {
        async fn evaluate(
            &self,
            expression: &str,
            variables: &Variables,
        ) -> Result<(String, i64), EvalError> {
            if expression == self.0 {
                panic!("evaluator crashed on '{}'", expression);
            }
            ArithmeticEvaluator.evaluate(expression, variables).await
        }
    }

    /// Evaluator that counts calls and rejects every expression
    struct Rejecting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Evaluator for Rejecting {
        async fn evaluate(
            &self,
            _expression: &str,
            _variables: &Variables,
        ) -> Result<(String, i64), EvalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EvalError::new("rejected"))
        }
    }

    #[tokio::test]
    async fn test_layered_batch() {
        let result = executor()
            .execute(&batch(&["a = 1", "b = 2", "c = a + b", "d = c * 2", "e = d + 1"]))
            .await
            .unwrap();

        assert_eq!(result, vars(&[("a", 1), ("b", 2), ("c", 3), ("d", 6), ("e", 7)]));
    }

    #[tokio::test]
    async fn test_forward_references() {
        let result = executor()
            .execute(&batch(&["e = d * 2", "d = b + c", "b = a", "c = a", "a = 2"]))
            .await
            .unwrap();

        assert_eq!(result, vars(&[("a", 2), ("b", 2), ("c", 2), ("d", 4), ("e", 8)]));
    }

    #[tokio::test]
    async fn test_independent_batch_runs_in_one_level() {
        let (tx, mut rx) = progress_channel();
        let result = executor()
            .with_config(ExecutorConfig::default().with_max_workers(4))
            .with_progress(tx)
            .execute(&batch(&["a = 1", "b = 2", "c = 3"]))
            .await
            .unwrap();

        assert_eq!(result, vars(&[("a", 1), ("b", 2), ("c", 3)]));

        let mut levels = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ExecutionEvent::LevelStarted {
                level,
                expressions,
                workers,
            } = event
            {
                levels.push((level, expressions, workers));
            }
        }
        assert_eq!(levels, vec![(0, 3, 3)]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = executor().execute(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_bound() {
        let evaluator = Arc::new(Tracking {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let lines: Vec<String> = (0..8).map(|i| format!("v{} = {}", i, i)).collect();

        let result = LeveledExecutor::new(evaluator.clone())
            .with_config(ExecutorConfig::default().with_max_workers(3))
            .execute(&lines)
            .await
            .unwrap();

        assert_eq!(result.len(), 8);
        let peak = evaluator.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak concurrency was {}", peak);
    }

    #[tokio::test]
    async fn test_level_timeout() {
        let config = ExecutorConfig::default()
            .with_level_timeout(Duration::from_millis(100))
            .with_grace_period(Duration::from_millis(50));

        let err = LeveledExecutor::new(Arc::new(Stuck))
            .with_config(config)
            .execute(&batch(&["a = 1", "b = 2"]))
            .await
            .unwrap_err();

        match err {
            ExecutionError::LevelTimeout {
                level,
                completed,
                expected,
                ..
            } => {
                assert_eq!(level, 0);
                assert_eq!(completed, 0);
                assert_eq!(expected, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_evaluation_error_aborts_batch() {
        let (tx, mut rx) = progress_channel();
        let err = executor()
            .with_progress(tx)
            .execute(&batch(&["a = 0", "b = 1 / a", "c = b + 1"]))
            .await
            .unwrap_err();

        match err {
            ExecutionError::Evaluation { expression, reason } => {
                assert_eq!(expression, "b = 1 / a");
                assert_eq!(reason, "division by zero");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut failed = None;
        while let Ok(event) = rx.try_recv() {
            if let ExecutionEvent::LevelFailed { level, .. } = event {
                failed = Some(level);
            }
        }
        assert_eq!(failed, Some(1));
    }

    #[tokio::test]
    async fn test_graph_errors_surface_before_evaluation() {
        let err = executor().execute(&batch(&["a = b", "b = a"])).await.unwrap_err();
        assert!(err.is_graph_error());

        let err = executor().execute(&batch(&["x = y"])).await.unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[tokio::test]
    async fn test_snapshot_isolation() {
        // `j` and `k` share a level and both read `i` from the snapshot
        let result = executor()
            .execute(&batch(&["i = 1", "j = ++i", "k = i + 10"]))
            .await
            .unwrap();

        assert_eq!(result, vars(&[("i", 1), ("j", 2), ("k", 11)]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocked_worker_does_not_delay_timeout() {
        let config = ExecutorConfig::default()
            .with_level_timeout(Duration::from_millis(100))
            .with_grace_period(Duration::from_millis(100));

        let start = Instant::now();
        let err = LeveledExecutor::new(Arc::new(Blocking(Duration::from_secs(2))))
            .with_config(config)
            .execute(&batch(&["a = 1"]))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ExecutionError::LevelTimeout { level: 0, .. }));
        assert!(
            elapsed < Duration::from_secs(1),
            "execute returned after {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_worker_panic_is_worker_failure() {
        let err = LeveledExecutor::new(Arc::new(Panicking("b = 2")))
            .with_config(ExecutorConfig::default().with_max_workers(2))
            .execute(&batch(&["a = 1", "b = 2", "c = 3"]))
            .await
            .unwrap_err();

        match err {
            ExecutionError::WorkerFailure { level, message } => {
                assert_eq!(level, 0);
                assert!(message.contains("2 of 3"), "message was {}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_worker_stops_after_first_error() {
        let evaluator = Arc::new(Rejecting {
            calls: AtomicUsize::new(0),
        });

        let err = LeveledExecutor::new(evaluator.clone())
            .with_config(ExecutorConfig::default().with_max_workers(1))
            .execute(&batch(&["a = 1", "b = 2", "c = 3"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Evaluation { .. }));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }
}
