//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use finrag_ingest::{IngestConfig, IngestPipeline, IngestReport};
use finrag_store::{index_records, IndexStats};
use tracing::info;

/// What an ingest run did
#[derive(Debug)]
pub struct IngestOutcome {
    /// Pipeline report
    pub report: IngestReport,
    /// Store changes; `None` for dry runs and empty runs
    pub stats: Option<IndexStats>,
}

/// Apply command-line overrides to the configured pipeline settings.
pub fn ingest_config(args: &IngestArgs, base: &IngestConfig) -> IngestConfig {
    let mut config = base.clone();
    config.recursive |= args.recursive;
    config.count_words |= args.count_words;
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout_secs {
        config.file_timeout_secs = Some(timeout);
    }
    config
}

/// Execute the ingest command.
pub async fn execute_ingest(args: IngestArgs, ctx: &AppContext) -> Result<IngestOutcome> {
    let formatter = &ctx.formatter;
    let config = ingest_config(&args, &ctx.config.ingest);
    config.validate().map_err(CliError::Config)?;

    println!(
        "{}",
        formatter.info(&format!(
            "Ingesting {} (max tokens per chunk: {})",
            args.dir.display(),
            config.max_tokens
        ))
    );

    let pipeline = IngestPipeline::new(config)?;
    let report = pipeline.run(&args.dir).await?;
    println!("{}", formatter.ingest_report(&report)?);

    if report.summary.is_empty() {
        return Ok(IngestOutcome { report, stats: None });
    }
    if report.summary.succeeded == 0 {
        return Err(CliError::NothingIngested(report.summary.total_files));
    }
    if args.dry_run {
        println!("{}", formatter.info("Dry run: nothing was stored"));
        return Ok(IngestOutcome { report, stats: None });
    }

    let task_ctx = ctx.clone();
    let records = report.records.clone();
    let stats = tokio::task::spawn_blocking(move || -> Result<IndexStats> {
        let mut store = task_ctx.open_store()?;
        let model = task_ctx.embedding_model()?;
        info!(model = model.model_name(), records = records.len(), "embedding chunks");
        Ok(index_records(&mut store, &model, &records, task_ctx.config.store.batch_size)?)
    })
    .await??;

    println!("{}", formatter.index_stats(&stats, &ctx.config.store.collection));
    Ok(IngestOutcome {
        report,
        stats: Some(stats),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_applied() {
        let args = IngestArgs {
            dir: PathBuf::from("raw"),
            recursive: true,
            max_tokens: Some(128),
            concurrency: None,
            timeout_secs: Some(30),
            count_words: true,
            dry_run: false,
        };
        let base = IngestConfig {
            concurrency: 3,
            ..IngestConfig::default()
        };

        let config = ingest_config(&args, &base);

        assert!(config.recursive);
        assert_eq!(config.max_tokens, 128);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.file_timeout_secs, Some(30));
        assert!(config.count_words);
    }

    #[test]
    fn test_config_recursive_kept_without_flag() {
        let args = IngestArgs {
            dir: PathBuf::from("raw"),
            recursive: false,
            max_tokens: None,
            concurrency: None,
            timeout_secs: None,
            count_words: false,
            dry_run: true,
        };
        let base = IngestConfig {
            recursive: true,
            ..IngestConfig::default()
        };

        assert!(ingest_config(&args, &base).recursive);
    }
}
