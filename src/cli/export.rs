//! Export command - healthy notes as JSONL

use super::diagnose::write_output;
use super::open_session;
use anyhow::Result;
use console::style;
use std::path::Path;

pub fn run(vault: &Path, workers: Option<usize>, output: Option<&Path>) -> Result<()> {
    let session = open_session(vault, workers, None)?;
    let summary = session.export()?;

    eprintln!(
        "Exporting {} healthy notes, {} notes have issues",
        style(summary.healthy).green(),
        style(summary.problematic).yellow()
    );

    let mut jsonl = summary.to_jsonl();
    if !jsonl.is_empty() {
        jsonl.push('\n');
    }
    write_output(&jsonl, output)
}
