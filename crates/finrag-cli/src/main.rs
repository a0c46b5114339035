//! finrag CLI - ingest financial documents and ask questions about them.

use clap::Parser;
use finrag_cli::commands;
use finrag_cli::repl;
use finrag_cli::{AppContext, Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> finrag_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config; a missing default file is written out with defaults
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => {
            let path = Config::path()?;
            if path.exists() {
                Config::load_from(&path)?
            } else {
                let config = Config::default();
                config.save_to(&path).ok();
                config
            }
        }
    };

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);
    let ctx = AppContext::new(config, formatter, cli.api_key);

    match cli.command {
        None | Some(Command::Chat) => repl::run_repl(&ctx).await?,
        Some(Command::Ingest(args)) => {
            commands::execute_ingest(args, &ctx).await?;
        }
        Some(Command::Convert(args)) => {
            commands::execute_convert(args, &ctx).await?;
        }
        Some(Command::Search(args)) => {
            commands::execute_search(args, &ctx).await?;
        }
        Some(Command::Ask(args)) => {
            commands::execute_ask(args, &ctx).await?;
        }
        Some(Command::Sources) => {
            commands::execute_sources(&ctx).await?;
        }
        Some(Command::Clear(args)) => {
            commands::execute_clear(args, &ctx).await?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "finrag=debug" } else { "finrag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
