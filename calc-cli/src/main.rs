// Calc CLI
// Command-line front end for leveled batch evaluation

mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

/// Evaluate batches of integer assignments, level by level
#[derive(Debug, Parser)]
#[command(name = "calc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Available commands
#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a batch and print the resulting variables
    Run(commands::run::RunArgs),

    /// Show the dependency levels of a batch without evaluating it
    Plan(commands::plan::PlanArgs),

    /// Validate syntax, references and cycles of a batch
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => commands::run::execute(args, cli.verbose > 0).await,
        Command::Plan(args) => commands::plan::execute(args),
        Command::Check(args) => commands::check::execute(args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
