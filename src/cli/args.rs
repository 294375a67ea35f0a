//! CLI argument definitions using clap
//!
//! Commands:
//! - bookshelf init --config <path>
//! - bookshelf seed --config <path>
//! - bookshelf list --config <path> [--min-rating N]
//! - bookshelf add --config <path> --name N [--comment C] --rating R [--id I]
//! - bookshelf delete --config <path> --id I
//! - bookshelf clear --config <path>
//! - bookshelf compact --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bookshelf - a small persistent book list
#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log every operation (TRACE) instead of the configured level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and an empty log
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,
    },

    /// Insert the demo books if the database is empty
    Seed {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,
    },

    /// Print every book, sorted by name
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,

        /// Only books rated at least this (0-4)
        #[arg(long)]
        min_rating: Option<i64>,
    },

    /// Add a book, or overwrite the one with the same id
    Add {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        comment: Option<String>,

        /// Rating from 0 (not recommended) to 4 (outstanding)
        #[arg(long)]
        rating: i64,

        /// Existing id to overwrite; a new one is assigned when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Delete the book with the given id
    Delete {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,

        #[arg(long)]
        id: String,
    },

    /// Delete every book
    Clear {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,
    },

    /// Rewrite the log down to the live records
    Compact {
        /// Path to configuration file
        #[arg(long, default_value = "./bookshelf.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "bookshelf", "add", "--config", "c.json", "--name", "Dune", "--rating", "3",
        ])
        .unwrap();
        match cli.command {
            Command::Add {
                config,
                name,
                comment,
                rating,
                id,
            } => {
                assert_eq!(config, PathBuf::from("c.json"));
                assert_eq!(name, "Dune");
                assert_eq!(comment, None);
                assert_eq!(rating, 3);
                assert_eq!(id, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_with_verbose() {
        let cli = Cli::try_parse_from(["bookshelf", "list", "--min-rating", "2", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::List { config, min_rating } => {
                assert_eq!(config, PathBuf::from("./bookshelf.json"));
                assert_eq!(min_rating, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_id() {
        assert!(Cli::try_parse_from(["bookshelf", "delete"]).is_err());
    }
}
