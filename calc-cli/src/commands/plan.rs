use crate::commands::{BatchArgs, OutputFormat};
use crate::output;

use clap::Args;
use color_eyre::eyre::eyre;
use color_eyre::Result;

use calc_service::plan;

/// Show how a batch is split into dependency levels
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let batch = args.batch.load()?;

    let levels = plan(&batch).map_err(|e| eyre!("Planning failed: {}", e.message))?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
        return Ok(());
    }

    output::status(
        "Planned",
        &format!("{} expressions in {} levels", batch.len(), levels.len()),
    );

    for level in &levels {
        println!("Level {} ({} expressions)", level.index, level.len());
        for expression in &level.expressions {
            if expression.dependencies.is_empty() {
                println!("  {}", expression.source);
            } else {
                let reads: Vec<&str> =
                    expression.dependencies.iter().map(String::as_str).collect();
                println!("  {}    reads: {}", expression.source, reads.join(", "));
            }
        }
    }

    Ok(())
}
