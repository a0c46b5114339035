//! Sources and clear command implementations.

use crate::cli::ClearArgs;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use std::io::{self, BufRead, Write};

/// Execute the sources command.
pub async fn execute_sources(ctx: &AppContext) -> Result<Vec<(String, usize)>> {
    let task_ctx = ctx.clone();
    let sources = tokio::task::spawn_blocking(move || -> Result<Vec<(String, usize)>> {
        Ok(task_ctx.open_store()?.sources()?)
    })
    .await??;

    println!("{}", ctx.formatter.sources(&sources)?);
    Ok(sources)
}

/// Execute the clear command.
pub async fn execute_clear(args: ClearArgs, ctx: &AppContext) -> Result<usize> {
    let collection = ctx.config.store.collection.clone();
    if !args.yes {
        print!("Remove every chunk from '{}'? [y/N] ", collection);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            return Err(CliError::InvalidInput("Cancelled".to_string()));
        }
    }

    let task_ctx = ctx.clone();
    let removed = tokio::task::spawn_blocking(move || -> Result<usize> { Ok(task_ctx.open_store()?.clear()?) }).await??;

    println!(
        "{}",
        ctx.formatter.success(&format!("Removed {} chunk(s) from '{}'", removed, collection))
    );
    Ok(removed)
}
