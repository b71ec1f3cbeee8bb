use crate::commands::{BatchArgs, OutputFormat};
use crate::output;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use calc_service::{
    progress_channel, Calculator, ExecutionEvent, ExecutionStrategy, ExecutorConfig,
};

/// Evaluate a batch of assignments
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Execution strategy (sequential or leveled)
    #[arg(long, short = 's', value_name = "STRATEGY")]
    pub strategy: Option<ExecutionStrategy>,

    /// Maximum workers per level (0 = host parallelism)
    #[arg(long, short = 'w', value_name = "N")]
    pub workers: Option<usize>,

    /// Seconds to wait for the next result of a level
    #[arg(long, value_name = "SECS")]
    pub level_timeout: Option<f64>,

    /// Seconds workers get to exit before being aborted
    #[arg(long, value_name = "SECS")]
    pub grace_period: Option<f64>,

    /// Configuration file (default: ~/.calc/config.yaml)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn execute(args: RunArgs, verbose: bool) -> Result<()> {
    let batch = args.batch.load()?;
    let config = resolve_config(&args)?;

    // Create progress channel and calculator
    let (tx, mut rx) = progress_channel();
    let calculator = Calculator::with_progress(config, tx);

    output::status(
        "Evaluating",
        &format!(
            "{} expressions ({})",
            batch.len(),
            calculator.executor().strategy()
        ),
    );

    // Spawn execution in background
    let exec_handle = tokio::spawn(async move { calculator.evaluate_multiple(&batch).await });

    // Process events in the foreground
    while let Some(event) = rx.recv().await {
        match event {
            ExecutionEvent::BatchStarted { total_levels, .. } if verbose && total_levels > 0 => {
                output::info(&format!("{} levels planned", total_levels));
            }

            ExecutionEvent::LevelStarted {
                level,
                expressions,
                workers,
            } if verbose => {
                output::level_header(level, expressions, workers);
            }

            ExecutionEvent::ExpressionEvaluated {
                expression, value, ..
            } if verbose => {
                output::dim(&format!("    {}  => {}", expression, value));
            }

            ExecutionEvent::LevelFailed { level, error } => {
                output::failure(&format!("Level {} failed: {}", level, error));
            }

            ExecutionEvent::BatchCompleted {
                success,
                variables,
                duration,
            } => {
                if success {
                    output::success(&format!(
                        "{} variables in {:.3}s",
                        variables,
                        duration.as_secs_f64()
                    ));
                } else {
                    output::failure(&format!(
                        "Evaluation failed after {:.3}s",
                        duration.as_secs_f64()
                    ));
                }
            }

            _ => {}
        }
    }

    let variables = exec_handle
        .await
        .wrap_err("Execution task failed")?
        .map_err(|e| eyre!("Evaluation failed: {}", e))?;

    let sorted: BTreeMap<String, i64> = variables.into_iter().collect();

    match args.format {
        OutputFormat::Text => {
            for (name, value) in &sorted {
                output::binding(name, *value);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sorted)?);
        }
    }

    Ok(())
}

/// Config file (or defaults) overridden by command-line flags
fn resolve_config(args: &RunArgs) -> Result<ExecutorConfig> {
    let mut config = ExecutorConfig::load(args.config.as_deref())
        .wrap_err("Failed to load configuration")?;

    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy);
    }
    if let Some(workers) = args.workers {
        config = config.with_max_workers(workers);
    }
    if let Some(secs) = args.level_timeout {
        config = config.with_level_timeout(seconds("--level-timeout", secs)?);
    }
    if let Some(secs) = args.grace_period {
        config = config.with_grace_period(seconds("--grace-period", secs)?);
    }

    config.validate()?;
    tracing::debug!(?config, "resolved executor config");

    Ok(config)
}

fn seconds(flag: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| eyre!("{} must be a non-negative number of seconds, got {}", flag, secs))
}
