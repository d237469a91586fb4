//! # Scripture Harness CLI (`scripture`)
//!
//! Manage Bible translations, ingest their text, and ask or compare
//! questions across them.
//!
//! ```bash
//! scripture --config ./config/scripture.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scripture init` | Create the SQLite database and schema |
//! | `scripture translation create <id> <name>` | Register a translation |
//! | `scripture translation delete <id>` | Remove a translation and its passages |
//! | `scripture translation list` | List translations |
//! | `scripture translation current` | Show the configured default translation |
//! | `scripture ingest <id> <path>` | Ingest a file or directory |
//! | `scripture ask "<question>"` | Answer from one translation |
//! | `scripture compare "<question>" --translations a,b` | Compare translations |
//! | `scripture stats` | Database statistics |
//! | `scripture chat` | Interactive session |
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=scripture_harness=debug`) for logs on stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scripture_harness::{app, chat, config, db, ingest, migrate, output, stats};
use scripture_harness_core::harness::MAX_K;

#[derive(Parser)]
#[command(
    name = "scripture",
    about = "Scripture Harness: question answering and comparison over Bible translations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/scripture.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Manage translations.
    Translation {
        #[command(subcommand)]
        action: TranslationAction,
    },

    /// Ingest a file or directory into a translation.
    ///
    /// Accepts `.txt`, `.md`, `.pdf` and `.docx`. Directories are filtered by
    /// `[ingest] include_globs` and `exclude_globs`.
    Ingest {
        /// Translation id.
        translation: String,
        /// File or directory.
        path: PathBuf,
    },

    /// Answer a question from one translation.
    Ask {
        question: String,

        /// Translation id. Defaults to `[retrieval] default_translation`.
        #[arg(long)]
        translation: Option<String>,

        /// Number of passages to retrieve (1-10).
        #[arg(long, value_parser = parse_k)]
        k: Option<usize>,

        /// Omit source previews.
        #[arg(long)]
        no_sources: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Compare a question or reference across translations.
    Compare {
        question: String,

        /// Comma-separated translation ids (at least two).
        #[arg(long, value_delimiter = ',', required = true)]
        translations: Vec<String>,

        /// Passages per translation for topical questions (1-10).
        #[arg(long, value_parser = parse_k)]
        k: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show per-translation chunk counts and database size.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Interactive question session.
    Chat {
        /// Translation to start with.
        #[arg(long)]
        translation: Option<String>,
    },
}

#[derive(Subcommand)]
enum TranslationAction {
    /// Register a translation with an empty passage store.
    Create {
        /// Identifier: letters, digits and underscores (e.g. `KJV`).
        id: String,
        /// Display name (e.g. "King James Version").
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a translation and all of its passages.
    Delete { id: String },
    /// List registered translations.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show the translation selected at startup.
    Current,
}

fn parse_k(s: &str) -> Result<usize, String> {
    let k: usize = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (1..=MAX_K).contains(&k) {
        Ok(k)
    } else {
        Err(format!("k must be in [1, {}]", MAX_K))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    if let Commands::Stats { json } = cli.command {
        let pool = db::connect(&cfg).await?;
        migrate::apply_schema(&pool).await?;
        let s = stats::collect_stats(&pool, &cfg.db.path).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&s)?);
        } else {
            stats::print_stats(&s);
        }
        pool.close().await;
        return Ok(());
    }

    let app = app::open(&cfg).await?;
    let harness = &app.harness;

    match cli.command {
        Commands::Init | Commands::Stats { .. } => {}
        Commands::Translation { action } => match action {
            TranslationAction::Create {
                id,
                name,
                description,
            } => {
                let t = harness.registry().create(&id, &name, &description).await?;
                println!("Created translation {} ({}).", t.id, t.name);
            }
            TranslationAction::Delete { id } => {
                harness.registry().delete(&id).await?;
                println!("Deleted translation {}.", id);
            }
            TranslationAction::List { json } => {
                let list = harness.registry().list();
                if json {
                    println!("{}", serde_json::to_string_pretty(&list)?);
                } else {
                    let current = harness.registry().current_id();
                    print!("{}", output::render_translations(&list, current.as_deref()));
                }
            }
            TranslationAction::Current => match harness.registry().current() {
                Some(t) => println!("{} ({})", t.id, t.name),
                None => println!("No translation selected."),
            },
        },
        Commands::Ingest { translation, path } => {
            let summary = ingest::ingest_path(harness, &translation, &path, &cfg.ingest).await?;
            print!("{}", output::render_ingest(&summary));
        }
        Commands::Ask {
            question,
            translation,
            k,
            no_sources,
            json,
        } => {
            let response = harness
                .ask(&question, translation.as_deref(), k, !no_sources)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", output::render_ask(&response));
            }
        }
        Commands::Compare {
            question,
            translations,
            k,
            json,
        } => {
            let outcome = harness.compare(&question, &translations, k).await?;
            if json {
                let value = output::comparison_json(&outcome)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", output::render_comparison(&outcome));
            }
        }
        Commands::Chat { translation } => {
            if let Some(id) = translation {
                harness.registry().switch(&id).await?;
            }
            chat::run_chat(harness).await?;
        }
    }

    app.pool.close().await;
    Ok(())
}
