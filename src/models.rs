//! Core data models for notehealth
//!
//! These models are shared by the rules, the session and the reporters:
//! issues, their severities and spans, and the persisted diagnosis snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build a deterministic issue ID from its parts.
///
/// IDs are plain `-`-joined strings (`rule-id`, document path, then any
/// disambiguator such as an offset or a sub-check suffix), so an unchanged
/// vault always reproduces the same IDs. That is what makes the ignore list
/// and the saved snapshot survive a rescan.
pub fn issue_id(parts: &[&str]) -> String {
    parts.join("-")
}

/// Severity levels for issues
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Half-open character span `[start, end)` into a document's content.
///
/// `{0, 0}` marks a document-level issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span used by issues that concern the whole document
    pub const DOCUMENT: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_document_level(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// A single finding produced by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiagnosticIssue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub context_preview: String,
    #[serde(default)]
    pub position: Span,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub is_ignored: bool,
}

/// Summary of issues by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl IssueSummary {
    pub fn from_issues(issues: &[DiagnosticIssue]) -> Self {
        let mut summary = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Average resolved-link density over the non-excluded documents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ConnectionDensity {
    /// Average inbound links per document, rounded to one decimal
    #[serde(default)]
    pub inbound: f64,
    /// Average outbound links per document, rounded to one decimal
    #[serde(default)]
    pub outbound: f64,
    /// Number of documents the averages were taken over
    #[serde(default)]
    pub documents: usize,
}

impl std::fmt::Display for ConnectionDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.documents == 0 {
            return write!(f, "[↑ 0] [↓ 0]");
        }
        write!(f, "[↑ {:.1}] [↓ {:.1}]", self.inbound, self.outbound)
    }
}

/// Persisted result of the last full or incremental diagnosis.
///
/// Replaced wholesale after a full run, patched in place by a recheck.
/// Every field defaults, so snapshots written by older builds still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiagnosisSnapshot {
    pub issues: Vec<DiagnosticIssue>,
    pub health_score: u32,
    pub atom_count: usize,
    pub connection_density: ConnectionDensity,
    /// Epoch milliseconds
    pub diagnosis_time: i64,
}

impl DiagnosisSnapshot {
    /// Non-ignored issue count per rule, i.e. the badge shown on each rule card
    pub fn issue_counts_by_rule(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues.iter().filter(|i| !i.is_ignored) {
            *counts.entry(issue.rule_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Saved issues for one document, ignored ones excluded
    pub fn issues_for(&self, path: &str) -> Vec<DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.file_path == path && !i.is_ignored)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(rule: &str, severity: Severity, ignored: bool) -> DiagnosticIssue {
        DiagnosticIssue {
            id: issue_id(&[rule, "a.md"]),
            rule_id: rule.to_string(),
            file_path: "a.md".to_string(),
            file_name: "a.md".to_string(),
            severity,
            is_ignored: ignored,
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_id_is_stable() {
        assert_eq!(issue_id(&["naked-links", "notes/a.md", "42"]), "naked-links-notes/a.md-42");
        assert_eq!(
            issue_id(&["naked-links", "notes/a.md", "42"]),
            issue_id(&["naked-links", "notes/a.md", "42"])
        );
    }

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Medium.to_string(), "medium");
    }

    #[test]
    fn test_density_display() {
        let empty = ConnectionDensity::default();
        assert_eq!(empty.to_string(), "[↑ 0] [↓ 0]");

        let density = ConnectionDensity { inbound: 1.5, outbound: 2.0, documents: 4 };
        assert_eq!(density.to_string(), "[↑ 1.5] [↓ 2.0]");
    }

    #[test]
    fn test_issue_summary_and_badges() {
        let snapshot = DiagnosisSnapshot {
            issues: vec![
                issue("metadata-integrity", Severity::High, false),
                issue("naked-links", Severity::Low, false),
                issue("naked-links", Severity::Low, true),
            ],
            ..Default::default()
        };

        let summary = IssueSummary::from_issues(&snapshot.issues);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.low, 2);
        assert_eq!(summary.total, 3);

        let counts = snapshot.issue_counts_by_rule();
        assert_eq!(counts.get("naked-links"), Some(&1));
        assert_eq!(snapshot.issues_for("a.md").len(), 2);
    }

    #[test]
    fn test_snapshot_missing_fields_default() {
        let snapshot: DiagnosisSnapshot =
            serde_json::from_str(r#"{"health_score": 80}"#).expect("parse snapshot");
        assert_eq!(snapshot.health_score, 80);
        assert!(snapshot.issues.is_empty());
        assert_eq!(snapshot.diagnosis_time, 0);
    }
}
