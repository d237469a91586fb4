//! Interactive session for `scripture chat`.
//!
//! Plain lines are questions for the current translation. Lines starting
//! with `:` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `:use <id>` | switch the current translation |
//! | `:compare a,b <question>` | compare across translations |
//! | `:list` | list translations |
//! | `:current` | show the current translation |
//! | `:help` | show commands |
//! | `:quit` / `:exit` | leave |

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use scripture_harness_core::Harness;

use crate::output;

const HELP: &str = "\
Commands:
  :use <id>                  switch translation
  :compare a,b <question>    compare translations
  :list                      list translations
  :current                   show current translation
  :quit                      leave
Anything else is asked against the current translation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Use(String),
    Compare {
        translations: Vec<String>,
        question: String,
    },
    List,
    Current,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return ChatCommand::Ask(line.to_string());
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };

    match cmd {
        "use" if !arg.is_empty() => ChatCommand::Use(arg.to_string()),
        "use" => ChatCommand::Invalid("usage: :use <id>".to_string()),
        "compare" => match arg.split_once(char::is_whitespace) {
            Some((ids, question)) if !question.trim().is_empty() => ChatCommand::Compare {
                translations: ids
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                question: question.trim().to_string(),
            },
            _ => ChatCommand::Invalid("usage: :compare a,b <question>".to_string()),
        },
        "list" => ChatCommand::List,
        "current" => ChatCommand::Current,
        "help" | "h" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!("unknown command ':{}' (try :help)", other)),
    }
}

/// Run the session on stdin/stdout until `:quit` or end of input.
pub async fn run_chat(harness: &Harness) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Scripture chat. Type :help for commands.");
    loop {
        let prompt = match harness.registry().current_id() {
            Some(id) => format!("{}> ", id),
            None => "> ".to_string(),
        };
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_line(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{}", HELP),
            ChatCommand::Invalid(msg) => println!("{}", msg),
            ChatCommand::List => {
                let current = harness.registry().current_id();
                print!(
                    "{}",
                    output::render_translations(&harness.registry().list(), current.as_deref())
                );
            }
            ChatCommand::Current => match harness.registry().current() {
                Some(t) => println!("{} ({})", t.id, t.name),
                None => println!("No translation selected."),
            },
            ChatCommand::Use(id) => match harness.registry().switch(&id).await {
                Ok(t) => println!("Using {} ({}).", t.id, t.name),
                Err(e) => println!("error: {}", e),
            },
            ChatCommand::Compare {
                translations,
                question,
            } => match harness.compare(&question, &translations, None).await {
                Ok(outcome) => print!("{}", output::render_comparison(&outcome)),
                Err(e) => println!("error: {}", e),
            },
            ChatCommand::Ask(question) => match harness.ask(&question, None, None, true).await {
                Ok(response) => print!("{}", output::render_ask(&response)),
                Err(e) => println!("error: {}", e),
            },
        }
    }
    Ok(())
}
