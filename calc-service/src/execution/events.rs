// Execution Events
// Progress reporting and event types for batch execution

use crate::config::ExecutionStrategy;

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during batch execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Batch execution started
    BatchStarted {
        strategy: ExecutionStrategy,
        total_expressions: usize,
        total_levels: usize,
    },

    /// Batch execution completed
    BatchCompleted {
        success: bool,
        variables: usize,
        duration: Duration,
    },

    /// Level execution started
    LevelStarted {
        level: usize,
        expressions: usize,
        workers: usize,
    },

    /// One expression produced its value
    ExpressionEvaluated {
        level: usize,
        expression: String,
        target: String,
        value: i64,
    },

    /// Level results were merged into the variable state
    LevelCompleted { level: usize, duration: Duration },

    /// Level was aborted
    LevelFailed { level: usize, error: String },
}

impl ExecutionEvent {
    /// Create a batch started event
    pub fn batch_started(
        strategy: ExecutionStrategy,
        total_expressions: usize,
        total_levels: usize,
    ) -> Self {
        Self::BatchStarted {
            strategy,
            total_expressions,
            total_levels,
        }
    }

    /// Create a batch completed event
    pub fn batch_completed(success: bool, variables: usize, duration: Duration) -> Self {
        Self::BatchCompleted {
            success,
            variables,
            duration,
        }
    }

    pub fn level_started(level: usize, expressions: usize, workers: usize) -> Self {
        Self::LevelStarted {
            level,
            expressions,
            workers,
        }
    }

    pub fn expression_evaluated(
        level: usize,
        expression: impl Into<String>,
        target: impl Into<String>,
        value: i64,
    ) -> Self {
        Self::ExpressionEvaluated {
            level,
            expression: expression.into(),
            target: target.into(),
            value,
        }
    }

    pub fn level_completed(level: usize, duration: Duration) -> Self {
        Self::LevelCompleted { level, duration }
    }

    pub fn level_failed(level: usize, error: impl Into<String>) -> Self {
        Self::LevelFailed {
            level,
            error: error.into(),
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ExecutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ExecutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ExecutionEvent) {
        if let Some(sender) = self {
            sender.send_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = progress_channel();

        tx.send_event(ExecutionEvent::batch_started(ExecutionStrategy::Leveled, 3, 2));
        tx.send_event(ExecutionEvent::level_started(0, 2, 2));

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            ExecutionEvent::BatchStarted {
                total_expressions: 3,
                total_levels: 2,
                ..
            }
        ));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ExecutionEvent::LevelStarted { workers: 2, .. }));
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (tx, rx) = progress_channel();
        drop(rx);
        tx.send_event(ExecutionEvent::level_failed(0, "boom"));
    }

    #[test]
    fn test_optional_sender() {
        let sender: Option<ProgressSender> = None;
        sender.send_event(ExecutionEvent::level_completed(0, Duration::ZERO));
    }
}
