//! Interactive question-answering session.

use crate::commands::ask::print_answer;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};
use std::path::PathBuf;
use tracing::error;

const PROMPT: &str = "Your question: ";

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput {
    Exit,
    Skip,
    Question(String),
}

/// Run the interactive session.
pub async fn run_repl(ctx: &AppContext) -> Result<()> {
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || run_blocking(&ctx)).await?
}

fn run_blocking(ctx: &AppContext) -> Result<()> {
    let formatter = &ctx.formatter;
    let agent = ctx.agent()?;

    print_banner(ctx);

    let editor_config = EditorConfig::builder()
        .max_history_size(ctx.config.settings.history_size)?
        .auto_add_history(false)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;

    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => match parse_line(&line) {
                ReplInput::Skip => continue,
                ReplInput::Exit => {
                    println!("\n{}", formatter.info("Thank you for using finrag. Goodbye!"));
                    break;
                }
                ReplInput::Question(question) => {
                    editor.add_history_entry(question.as_str()).ok();
                    println!();
                    match agent.run(&question) {
                        Ok(answer) => {
                            if let Err(e) = print_answer(ctx, &answer, true) {
                                eprintln!("{}", formatter.error(&e.to_string()));
                            }
                        }
                        Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                    }
                    println!();
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Type 'exit' or 'quit' to end the session"));
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                error!("line editor failed: {}", err);
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
    Ok(())
}

fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Skip;
    }
    match line.to_lowercase().as_str() {
        "exit" | "quit" => ReplInput::Exit,
        _ => ReplInput::Question(line.to_string()),
    }
}

fn print_banner(ctx: &AppContext) {
    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("Welcome to finrag!");
    println!("{}", rule);
    println!("Ask questions about your financial documents and reports.");
    println!(
        "{}",
        ctx.formatter.info(&format!(
            "Model: {} | Collection: {}",
            ctx.config.llm.model, ctx.config.store.collection
        ))
    );
    println!("Type 'exit' or 'quit' to end the session.\n");
}

fn get_history_path() -> Result<PathBuf> {
    let dir = Config::home_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words_case_insensitive() {
        assert_eq!(parse_line("exit"), ReplInput::Exit);
        assert_eq!(parse_line("  QUIT \n"), ReplInput::Exit);
        assert_eq!(parse_line("Exit"), ReplInput::Exit);
    }

    #[test]
    fn test_blank_lines_skipped() {
        assert_eq!(parse_line(""), ReplInput::Skip);
        assert_eq!(parse_line("   \t"), ReplInput::Skip);
    }

    #[test]
    fn test_question_trimmed() {
        assert_eq!(
            parse_line("  What was Q3 free cash flow?  "),
            ReplInput::Question("What was Q3 free cash flow?".to_string())
        );
        assert_eq!(parse_line("exit strategy?"), ReplInput::Question("exit strategy?".to_string()));
    }
}
