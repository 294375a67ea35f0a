//! CLI command implementations
//!
//! Each command loads the configuration, opens the database, runs one
//! operation and reports on `out`. Nothing is kept between invocations
//! except the commit log.

use std::io::{self, Write};
use std::path::Path;

use serde_json::json;

use crate::config::DatabaseConfig;
use crate::database::Database;
use crate::model::{Book, Rating};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_response, write_rows};

/// Parse arguments and run the selected command against stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(if cli.verbose {
        Severity::Trace
    } else {
        Severity::Warn
    });
    let verbose = cli.verbose;
    run_command(cli.command, verbose, &mut io::stdout().lock())
}

/// Run the appropriate command based on CLI args.
///
/// Diagnostics go to stderr from here on; `out` carries only command output.
pub fn run_command<W: Write>(cmd: Command, verbose: bool, out: &mut W) -> CliResult<()> {
    Logger::set_stderr_only(true);
    match cmd {
        Command::Init { config } => init(&load_config(&config, verbose)?, out),
        Command::Seed { config } => seed(&load_config(&config, verbose)?, out),
        Command::List { config, min_rating } => {
            list(&load_config(&config, verbose)?, min_rating, out)
        }
        Command::Add {
            config,
            name,
            comment,
            rating,
            id,
        } => {
            let rating = parse_rating(rating)?;
            let book = Book::with_id(id.unwrap_or_default(), name, comment.as_deref(), rating);
            add(&load_config(&config, verbose)?, &book, out)
        }
        Command::Delete { config, id } => delete(&load_config(&config, verbose)?, &id, out),
        Command::Clear { config } => clear(&load_config(&config, verbose)?, out),
        Command::Compact { config } => compact(&load_config(&config, verbose)?, out),
    }
}

fn load_config(path: &Path, verbose: bool) -> CliResult<DatabaseConfig> {
    let config = DatabaseConfig::load(path)?;
    if !verbose {
        Logger::set_min_severity(config.severity()?);
    }
    Ok(config)
}

fn parse_rating(raw: i64) -> CliResult<Rating> {
    Rating::try_from(raw).map_err(|e| CliError::invalid_argument(e.to_string()))
}

/// Create the data directory and an empty log
pub fn init<W: Write>(config: &DatabaseConfig, out: &mut W) -> CliResult<()> {
    let db = Database::open(config)?;
    write_response(
        out,
        json!({"initialized": true, "location": db.location()}),
    )
}

/// Insert the demo books, unless the database already holds books
pub fn seed<W: Write>(config: &DatabaseConfig, out: &mut W) -> CliResult<()> {
    let mut db = Database::open(config)?;
    let existing = db.fetch(&Book::all())?;

    if !existing.is_empty() {
        let count = existing.len().to_string();
        log_event_with_fields(Event::SeedSkipped, &[("existing", count.as_str())]);
        return write_response(out, json!({"inserted": 0}));
    }

    let keys = db.create_or_update_all(&Book::seed_data(), &Book::create_or_update())?;
    let count = keys.len().to_string();
    log_event_with_fields(Event::SeedInserted, &[("inserted", count.as_str())]);
    write_response(out, json!({"inserted": keys.len(), "ids": keys}))
}

/// Print books sorted by name, optionally only those rated `min_rating` or better
pub fn list<W: Write>(
    config: &DatabaseConfig,
    min_rating: Option<i64>,
    out: &mut W,
) -> CliResult<()> {
    let request = match min_rating {
        Some(raw) => Book::rated_at_least(parse_rating(raw)?),
        None => Book::all(),
    };
    let db = Database::open(config)?;
    let books = db.fetch(&request)?;
    write_rows(out, &books)
}

/// Insert or overwrite one book
pub fn add<W: Write>(config: &DatabaseConfig, book: &Book, out: &mut W) -> CliResult<()> {
    let mut db = Database::open(config)?;
    let id = db.create_or_update(book, &Book::create_or_update())?;
    write_response(out, json!({"id": id}))
}

/// Delete one book by id; a missing id is reported, not an error
pub fn delete<W: Write>(config: &DatabaseConfig, id: &str, out: &mut W) -> CliResult<()> {
    let mut db = Database::open(config)?;
    let deleted = db.delete(&Book::delete(id))?;
    write_response(out, json!({"id": id, "deleted": deleted}))
}

/// Delete every book
pub fn clear<W: Write>(config: &DatabaseConfig, out: &mut W) -> CliResult<()> {
    let mut db = Database::open(config)?;
    db.delete_all()?;
    write_response(out, json!({"cleared": true}))
}

/// Rewrite the log down to the live records
pub fn compact<W: Write>(config: &DatabaseConfig, out: &mut W) -> CliResult<()> {
    let mut db = Database::open(config)?;
    let before = db.log_size();
    db.compact()?;
    write_response(
        out,
        json!({"log_bytes_before": before, "log_bytes": db.log_size()}),
    )
}
