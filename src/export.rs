//! Export of healthy notes as JSONL
//!
//! A note is healthy when it is included and no issue names it. Each
//! healthy note becomes one line by substituting JSON-encoded values into
//! the export template and re-serialising the result.

use crate::config::Settings;
use crate::models::DiagnosticIssue;
use crate::rules::{Corpus, CorpusEntry};
use crate::vault::{DocumentStore, NoteMetadata};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of an export pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub healthy: usize,
    pub problematic: usize,
    /// One compact JSON object per healthy note
    pub lines: Vec<String>,
}

impl ExportSummary {
    pub fn to_jsonl(&self) -> String {
        self.lines.join("\n")
    }
}

/// Whether an included note has no issues at all
pub fn is_healthy(corpus: &Corpus, path: &str, issues: &[DiagnosticIssue]) -> bool {
    corpus.is_included(path) && !issues.iter().any(|i| i.file_path == path)
}

/// Export every healthy note through the settings' template
pub fn export_healthy(store: &dyn DocumentStore, settings: &Settings, issues: &[DiagnosticIssue]) -> ExportSummary {
    let corpus = Corpus::build(store, settings);
    let flagged: HashSet<&str> = issues.iter().map(|i| i.file_path.as_str()).collect();

    let mut summary = ExportSummary::default();
    for entry in corpus.documents() {
        if flagged.contains(entry.doc.path.as_str()) {
            summary.problematic += 1;
            continue;
        }
        summary.healthy += 1;

        let Some(content) = corpus.read(entry) else {
            continue;
        };
        match render(&settings.export_template, entry, &content) {
            Ok(line) => summary.lines.push(line),
            Err(e) => warn!("Export template failed for {}: {}", entry.doc.path, e),
        }
    }

    info!(
        "Exporting {} healthy notes, {} notes have issues",
        summary.healthy, summary.problematic
    );
    summary
}

fn render(template: &str, entry: &CorpusEntry, content: &str) -> Result<String, serde_json::Error> {
    let empty = NoteMetadata::default();
    let metadata = entry.metadata.as_deref().unwrap_or(&empty);
    let frontmatter = metadata.frontmatter.as_ref();

    let tags = metadata
        .tag_field()
        .map(|t| t.raw().join(", "))
        .unwrap_or_default();
    let note_type = frontmatter.and_then(|f| f.get_str("type")).unwrap_or_default();
    let links: Vec<Value> = metadata
        .links
        .iter()
        .map(|l| {
            json!({
                "link": l.target,
                "displayText": l.display,
                "original": l.original,
                "position": { "start": l.position.start, "end": l.position.end },
            })
        })
        .collect();
    let headings: Vec<Value> = metadata
        .headings
        .iter()
        .map(|h| json!({ "heading": h.text, "level": h.level, "line": h.line }))
        .collect();

    let substitutions = [
        ("{{content}}", serde_json::to_string(content)?),
        ("{{tags}}", serde_json::to_string(&tags)?),
        ("{{type}}", serde_json::to_string(&note_type)?),
        ("{{fileName}}", serde_json::to_string(&entry.doc.name)?),
        ("{{filePath}}", serde_json::to_string(&entry.doc.path)?),
        (
            "{{frontmatter}}",
            serde_json::to_string(&frontmatter.map(|f| f.to_json()).unwrap_or_else(|| json!({})))?,
        ),
        ("{{links}}", serde_json::to_string(&links)?),
        ("{{headings}}", serde_json::to_string(&headings)?),
    ];

    let mut filled = template.to_string();
    for (placeholder, value) in &substitutions {
        filled = filled.replace(placeholder, value);
    }

    let parsed: Value = serde_json::from_str(&filled)?;
    debug!("Rendered export line for {}", entry.doc.path);
    serde_json::to_string(&parsed)
}
