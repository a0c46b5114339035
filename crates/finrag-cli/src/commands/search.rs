//! Search command implementation.

use crate::cli::SearchArgs;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use finrag_domain::traits::ContextRetriever;
use finrag_domain::RetrievedChunk;

/// Execute the search command.
pub async fn execute_search(args: SearchArgs, ctx: &AppContext) -> Result<Vec<RetrievedChunk>> {
    if args.query.trim().is_empty() {
        return Err(CliError::InvalidInput("Search query cannot be empty".to_string()));
    }
    let k = args.k.unwrap_or(ctx.config.llm.k);
    if k == 0 {
        return Err(CliError::InvalidInput("k must be greater than 0".to_string()));
    }

    let task_ctx = ctx.clone();
    let query = args.query;
    let hits = tokio::task::spawn_blocking(move || -> Result<Vec<RetrievedChunk>> {
        let retriever = task_ctx.retriever()?;
        Ok(retriever.retrieve(&query, k)?)
    })
    .await??;

    println!("{}", ctx.formatter.search_results(&hits)?);
    Ok(hits)
}
