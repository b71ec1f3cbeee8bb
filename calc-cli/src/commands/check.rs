use crate::commands::BatchArgs;
use crate::output;

use clap::Args;
use color_eyre::eyre::bail;
use color_eyre::Result;

use calc_service::expression::Statement;
use calc_service::{levels, DependencyGraph};

/// Validate a batch without evaluating it
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let batch = args.batch.load()?;

    output::status("Checking", &format!("{} expressions", batch.len()));

    // Step 1: Statement syntax
    let mut malformed = 0;
    for (line, expression) in batch.iter().enumerate() {
        let checked = Statement::parse(expression).and_then(|statement| statement.simplify());
        if let Err(e) = checked {
            output::failure(&format!("#{} '{}': {}", line + 1, expression, e.message));
            malformed += 1;
        }
    }
    if malformed > 0 {
        bail!("{} malformed expression(s)", malformed);
    }
    output::check("Syntax valid");

    // Step 2: References
    let graph = match DependencyGraph::build(&batch) {
        Ok(graph) => graph,
        Err(e) => {
            output::failure(&e.message);
            bail!("Batch references undefined variables");
        }
    };
    output::check("All references defined");

    // Step 3: Cycles
    let order = match graph.topological_order() {
        Ok(order) => order,
        Err(e) => {
            output::failure(&e.message);
            bail!("Batch has circular dependencies");
        }
    };
    output::check("No circular dependencies");

    let levels = levels(&order);
    output::success(&format!(
        "Batch is valid ({} levels, widest {} expressions)",
        levels.len(),
        levels.iter().map(|l| l.len()).max().unwrap_or(0)
    ));

    Ok(())
}
