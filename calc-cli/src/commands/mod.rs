// CLI subcommands and the batch input they share

pub mod check;
pub mod plan;
pub mod run;

use std::io;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;

use calc_service::{parse_batch, read_batch};

/// Where a batch comes from
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Batch file with one assignment per line (`-` reads stdin)
    pub file: Option<PathBuf>,

    /// Append an expression to the batch (can be repeated)
    #[arg(long = "expr", short = 'e', value_name = "EXPR")]
    pub expressions: Vec<String>,
}

impl BatchArgs {
    /// Collect the batch: file lines first, then `-e` expressions
    pub fn load(&self) -> Result<Vec<String>> {
        let mut batch = match &self.file {
            Some(path) if path.as_os_str() == "-" => {
                let text = io::read_to_string(io::stdin()).wrap_err("Failed to read stdin")?;
                parse_batch(&text)
            }
            Some(path) => {
                if !path.exists() {
                    bail!("Batch file not found: {}", path.display());
                }
                read_batch(path)
                    .wrap_err_with(|| format!("Failed to read {}", path.display()))?
            }
            None => Vec::new(),
        };

        batch.extend(
            self.expressions
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        );

        if batch.is_empty() {
            bail!("No expressions given (pass a batch file or -e EXPR)");
        }

        Ok(batch)
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
