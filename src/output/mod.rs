use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

/// Serialize a document as a single line of JSON
pub fn format_as_json<T: Serialize>(document: &T) -> Result<String> {
    serde_json::to_string(document).context("Failed to serialize JSON document")
}

/// Print exactly one JSON document to stdout
pub fn print_to_console<T: Serialize>(document: &T) -> Result<()> {
    let content = format_as_json(document)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", content)?;
    handle.flush()?;
    Ok(())
}
