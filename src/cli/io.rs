//! Output handling for the CLI
//!
//! - Mutating commands answer with a single JSON object
//! - `list` prints one tab-separated row per book
//! - UTF-8 only

use std::io::Write;

use serde_json::Value;

use super::errors::CliResult;
use crate::model::Book;

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

/// Write one `name<TAB>rating` row per book
pub fn write_rows<W: Write>(out: &mut W, books: &[Book]) -> CliResult<()> {
    for book in books {
        writeln!(out, "{}\t{}", book.name, book.rating.value())?;
    }
    out.flush()?;

    Ok(())
}
