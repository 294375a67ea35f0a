//! CLI module for bookshelf
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - seed: Insert the demo books into an empty database
//! - list: Print books sorted by name
//! - add / delete / clear: Edit the book list
//! - compact: Shrink the commit log

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{add, clear, compact, delete, init, list, run, run_command, seed};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_response, write_rows};
