//! Vault health scoring
//!
//! # Scoring Formula
//!
//! ```text
//! penalty = Σ count(rule) × weight(rule)     (ignored issues excluded)
//! score   = round(max(0, 100 - penalty))
//! ```
//!
//! Weights come from the settings weight table; a rule without a weight
//! costs nothing. The auxiliary statistics (atom count, link density) are
//! taken over the included notes only.

use crate::config::Settings;
use crate::models::{ConnectionDensity, DiagnosticIssue};
use crate::rules::Corpus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Weighted health score in `0..=100`
pub fn health_score(issues: &[DiagnosticIssue], settings: &Settings) -> u32 {
    let ignored = settings.ignored_set();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for issue in issues.iter().filter(|i| !ignored.contains(i.id.as_str())) {
        *counts.entry(issue.rule_id.as_str()).or_insert(0) += 1;
    }

    let penalty: f64 = counts
        .iter()
        .map(|(rule, count)| *count as f64 * settings.weight(rule))
        .sum();

    (100.0 - penalty).clamp(0.0, 100.0).round() as u32
}

/// Score band used for colouring and status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreClass {
    Healthy,
    Warning,
    Critical,
}

impl ScoreClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreClass::Healthy => "healthy",
            ScoreClass::Warning => "warning",
            ScoreClass::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ScoreClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn score_class(score: u32) -> ScoreClass {
    if score >= 90 {
        ScoreClass::Healthy
    } else if score >= 70 {
        ScoreClass::Warning
    } else {
        ScoreClass::Critical
    }
}

/// Included notes whose front-matter `type` is a knowledge-atom type
pub fn atom_count(corpus: &Corpus) -> usize {
    let atom_types: HashSet<&str> = corpus
        .settings()
        .knowledge_atom_types
        .iter()
        .map(String::as_str)
        .collect();

    corpus
        .documents()
        .iter()
        .filter_map(|e| e.metadata.as_ref()?.frontmatter.as_ref()?.get_str("type"))
        .filter(|t| atom_types.contains(t.as_str()))
        .count()
}

/// Average resolved inbound/outbound links per included note.
///
/// Inbound counts only links whose source is itself included.
pub fn connection_density(corpus: &Corpus) -> ConnectionDensity {
    let documents = corpus.documents().len();
    if documents == 0 {
        return ConnectionDensity::default();
    }

    let graph = corpus.store().resolved_links();
    let mut inbound = 0usize;
    let mut outbound = 0usize;

    for entry in corpus.documents() {
        if let Some(targets) = graph.get(&entry.doc.path) {
            outbound += targets.values().sum::<usize>();
        }
    }
    for (source, targets) in &graph {
        if !corpus.is_included(source) {
            continue;
        }
        inbound += targets
            .iter()
            .filter(|(target, _)| corpus.is_included(target))
            .map(|(_, count)| count)
            .sum::<usize>();
    }

    ConnectionDensity {
        inbound: round1(inbound as f64 / documents as f64),
        outbound: round1(outbound as f64 / documents as f64),
        documents,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
