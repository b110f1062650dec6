//! `recital` command-line driver.
//!
//! # Responsibility
//! - Open the poem store and dispatch one command per invocation.
//! - Read request envelopes and documents as JSON, print results as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use recital_core::db::open_db;
use recital_core::practice::{hidden_word_count, select_hidden_quotes, select_hidden_words};
use recital_core::{
    default_log_level, init_logging, AnnotationService, DeleteRequest, EditRequest,
    IngestService, PoemDocument, PoemRepository, SqlitePoemRepository,
};
use rusqlite::Connection;
use std::io::Read;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "recital", version, about = "Poem memorization store")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "RECITAL_DB", default_value = "recital.sqlite3")]
    db: PathBuf,

    /// Directory for rolling log files; logging is off when unset.
    #[arg(long, env = "RECITAL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "RECITAL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode every `*.txt` poem in a directory and reconcile annotations.
    Ingest { dir: PathBuf },
    /// Apply an edit request (`-` reads stdin).
    Edit { request: PathBuf },
    /// Apply a delete request (`-` reads stdin).
    Delete { request: PathBuf },
    /// Write the poem-record document.
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the invalid-annotation log.
    InvalidLog {
        /// Only rows appended by this ingestion run.
        #[arg(long)]
        run: Option<Uuid>,
    },
    /// Replace all poems with a previously exported document.
    Restore { document: PathBuf },
    /// Pick occurrences to hide for a practice round.
    Practice {
        poem: String,
        /// Share of words to hide.
        #[arg(long, default_value_t = 25)]
        percent: u32,
        /// Hide this many whole quotes instead of random words.
        #[arg(long)]
        quotes: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(log_dir) = &cli.log_dir {
        let log_dir = absolute(log_dir)?;
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        init_logging(&level, &log_dir).context("failed to initialize logging")?;
    }

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    run(cli.command, &mut conn)
}

fn run(command: Command, conn: &mut Connection) -> Result<()> {
    match command {
        Command::Ingest { dir } => {
            let mut service = IngestService::new(SqlitePoemRepository::try_new(conn)?);
            let report = service
                .ingest_dir(&dir)
                .with_context(|| format!("ingestion of `{}` failed", dir.display()))?;
            for poem in &report.poems {
                println!(
                    "{} by {}: {} words, {} notes / {} quotes kept, {} notes / {} quotes demoted",
                    poem.title,
                    poem.author,
                    poem.word_count,
                    poem.carried_notes,
                    poem.carried_quotes,
                    poem.demoted_notes,
                    poem.demoted_quotes
                );
            }
            for title in &report.removed {
                println!("removed {title}");
            }
            println!("run {}", report.run_id);
        }
        Command::Edit { request } => {
            let request: EditRequest = read_json(&request)?;
            let mut service = AnnotationService::new(SqlitePoemRepository::try_new(conn)?);
            let response = service.handle_edit(&request)?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::Delete { request } => {
            let request: DeleteRequest = read_json(&request)?;
            let mut service = AnnotationService::new(SqlitePoemRepository::try_new(conn)?);
            let removed = service.handle_delete(&request)?;
            println!("{}", serde_json::json!({ "removed": removed }));
        }
        Command::Export { output } => {
            let repo = SqlitePoemRepository::try_new(conn)?;
            let json = serde_json::to_string_pretty(&repo.export_document()?)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("failed to write `{}`", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::InvalidLog { run } => {
            let repo = SqlitePoemRepository::try_new(conn)?;
            match run {
                Some(run_id) => {
                    for entry in repo.list_invalid_entries(Some(run_id))? {
                        println!(
                            "{}\t{}\t{}\t{}\t{}",
                            entry.poem_title,
                            entry.record.kind.as_str(),
                            entry.record.reason.as_str(),
                            entry.record.label.as_deref().unwrap_or("-"),
                            entry.record.words.join(" ")
                        );
                    }
                }
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&repo.load_invalid_log()?)?
                ),
            }
        }
        Command::Restore { document } => {
            let document: PoemDocument = read_json(&document)?;
            let mut service = IngestService::new(SqlitePoemRepository::try_new(conn)?);
            let restored = service.restore_document(document)?;
            println!("restored {restored} poems");
        }
        Command::Practice {
            poem,
            percent,
            quotes,
            seed,
        } => {
            let repo = SqlitePoemRepository::try_new(conn)?;
            let Some(record) = repo.get_poem(&poem)? else {
                bail!("poem not found: `{poem}`");
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let hidden = match quotes {
                Some(count) => select_hidden_quotes(&record.quotes, count, &mut rng),
                None => {
                    let count = hidden_word_count(&record.poem.text, percent);
                    select_hidden_words(&record.poem.text, count, &mut rng)
                }
            };
            info!(
                "event=practice_round module=cli status=ok hidden={}",
                hidden.len()
            );
            println!("{}", serde_json::to_string(&hidden)?);
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in `{}`", path.display()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("failed to resolve working directory")?
        .join(path))
}
