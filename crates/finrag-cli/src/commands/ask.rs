//! Ask command implementation.

use crate::cli::AskArgs;
use crate::config::OutputFormat;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use finrag_llm::AgentAnswer;
use std::io::{self, Write};
use std::time::Duration;

/// Write `text` one character at a time, then a newline.
pub fn stream_text<W: Write>(out: &mut W, text: &str, delay: Duration) -> io::Result<()> {
    for ch in text.chars() {
        write!(out, "{}", ch)?;
        out.flush()?;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    writeln!(out)?;
    out.flush()
}

/// Print an answer the way the current settings ask for.
///
/// Blocks while streaming; call from a blocking context.
pub fn print_answer(ctx: &AppContext, answer: &AgentAnswer, stream: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match ctx.formatter.format() {
        OutputFormat::Json => writeln!(stdout, "{}", ctx.formatter.answer(answer)?)?,
        OutputFormat::Table => {
            write!(stdout, "{}", ctx.formatter.agent_label())?;
            let delay = if stream {
                Duration::from_millis(ctx.config.settings.stream_delay_ms)
            } else {
                Duration::ZERO
            };
            stream_text(&mut stdout, &answer.text, delay)?;
        }
    }
    Ok(())
}

/// Execute the ask command.
pub async fn execute_ask(args: AskArgs, ctx: &AppContext) -> Result<AgentAnswer> {
    let question = args.text();
    if question.trim().is_empty() {
        return Err(CliError::InvalidInput("Question cannot be empty".to_string()));
    }

    let task_ctx = ctx.clone();
    let stream = !args.no_stream;
    let answer = tokio::task::spawn_blocking(move || -> Result<AgentAnswer> {
        let agent = task_ctx.agent()?;
        let answer = agent.run(question.trim())?;
        print_answer(&task_ctx, &answer, stream)?;
        Ok(answer)
    })
    .await??;

    Ok(answer)
}
