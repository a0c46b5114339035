//! Convert command implementation.

use crate::cli::ConvertArgs;
use crate::context::AppContext;
use crate::error::Result;
use finrag_ingest::{IngestPipeline, ProcessingResult};

/// Execute the convert command.
pub async fn execute_convert(args: ConvertArgs, ctx: &AppContext) -> Result<Vec<ProcessingResult>> {
    let mut config = ctx.config.ingest.clone();
    config.recursive |= args.recursive;

    let pipeline = IngestPipeline::exporter(config)?;
    let results = pipeline.convert_directory(&args.dir, &args.output).await?;

    println!("{}", ctx.formatter.conversion_results(&results)?);
    Ok(results)
}
