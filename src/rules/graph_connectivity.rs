//! Graph connectivity rule
//!
//! Counts inbound and outbound links per note and reports information
//! islands (no links either way) and leaves (linked to, linking nowhere).
//!
//! Link targets are resolved with a sibling heuristic: `[[x]]` in
//! `dir/note.md` points at `dir/x.md`. Notes linked from another folder
//! therefore miss those inbound counts. Corpus statistics use the store's
//! resolved link graph instead.
//!
//! A note at the vault root resolves `[[x]]` to `x.md`, so root notes do
//! collect inbound links. Earlier versions of this heuristic produced
//! `/x.md` there, which never matched and left every root note without
//! inbound links.

use super::base::Rule;
use super::corpus::Corpus;
use crate::config::{Language, GRAPH_CONNECTIVITY};
use crate::models::{issue_id, DiagnosticIssue, Severity, Span};
use crate::vault::Document;
use anyhow::Result;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounts {
    pub inbound: usize,
    pub outbound: usize,
}

/// Resolve a link target relative to the linking note's folder
pub fn sibling_path(source: &Document, target: &str) -> String {
    let file = if target.to_lowercase().ends_with(".md") {
        target.to_string()
    } else {
        format!("{target}.md")
    };
    match source.folder() {
        "" => file,
        dir => format!("{dir}/{file}"),
    }
}

/// Inbound/outbound counts for every included note and every sibling target
pub fn link_counts(corpus: &Corpus) -> IndexMap<String, LinkCounts> {
    let mut counts: IndexMap<String, LinkCounts> = IndexMap::new();

    for entry in corpus.documents() {
        counts.entry(entry.doc.path.clone()).or_default();
        let Some(metadata) = entry.metadata.as_ref() else {
            continue;
        };

        if let Some(own) = counts.get_mut(&entry.doc.path) {
            own.outbound += metadata.links.len();
        }
        for link in metadata.links.iter().filter(|l| l.is_internal()) {
            if link.target.is_empty() {
                continue;
            }
            let target = sibling_path(&entry.doc, &link.target);
            counts.entry(target).or_default().inbound += 1;
        }
    }

    counts
}

pub struct GraphConnectivityRule {
    language: Language,
}

impl GraphConnectivityRule {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl Rule for GraphConnectivityRule {
    fn id(&self) -> &'static str {
        GRAPH_CONNECTIVITY
    }

    fn name(&self) -> &'static str {
        "Graph connectivity"
    }

    fn description(&self) -> &'static str {
        "Checks for unconnected information islands and dead-end notes"
    }

    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
        let mut issues = Vec::new();

        for (path, counts) in link_counts(corpus) {
            // Targets that were never notes, or are excluded, stay silent
            let Some(entry) = corpus.entry(&path) else {
                continue;
            };

            if counts.inbound == 0 && counts.outbound == 0 {
                let preview = self.language.pick(
                    "Isolated node (inbound=0 and outbound=0)".to_string(),
                    "信息孤岛节点 (入链=0 且 出链=0)".to_string(),
                );
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    issue_id(&[self.id(), &path, "isolated"]),
                    preview,
                    Span::DOCUMENT,
                    Severity::Medium,
                ));
            } else if counts.outbound == 0 {
                let preview = self.language.pick(
                    "Leaf node (outbound=0 but inbound>0)".to_string(),
                    "终点节点 (出链=0 但 入链>0)".to_string(),
                );
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    issue_id(&[self.id(), &path, "leaf"]),
                    preview,
                    Span::DOCUMENT,
                    Severity::Low,
                ));
            }
        }

        Ok(issues)
    }
}
