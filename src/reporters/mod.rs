//! Output reporters for diagnosis results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::config::Language;
use crate::models::{ConnectionDensity, DiagnosisSnapshot, DiagnosticIssue, IssueSummary};
use crate::rules::display_name;
use crate::scoring::{score_class, ScoreClass};
use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Issues of one rule, as shown on a rule card
#[derive(Debug, Clone, Serialize)]
pub struct RuleGroup {
    pub rule_id: String,
    pub name: String,
    pub count: usize,
    pub issues: Vec<DiagnosticIssue>,
}

/// Report view of a snapshot; ignored issues are hidden
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub health_score: u32,
    pub score_class: ScoreClass,
    pub atom_count: usize,
    pub connection_density: ConnectionDensity,
    pub density_summary: String,
    /// RFC 3339, empty when the snapshot has no timestamp
    pub diagnosed_at: String,
    pub summary: IssueSummary,
    pub ignored: usize,
    pub rules: Vec<RuleGroup>,
    #[serde(skip)]
    pub language: Language,
}

impl DiagnosisReport {
    pub fn new(snapshot: &DiagnosisSnapshot, language: Language) -> Self {
        let visible: Vec<DiagnosticIssue> = snapshot
            .issues
            .iter()
            .filter(|i| !i.is_ignored)
            .cloned()
            .collect();

        let mut groups: IndexMap<String, Vec<DiagnosticIssue>> = IndexMap::new();
        for issue in &visible {
            groups.entry(issue.rule_id.clone()).or_default().push(issue.clone());
        }
        let rules = groups
            .into_iter()
            .map(|(rule_id, issues)| RuleGroup {
                name: display_name(&rule_id, language),
                count: issues.len(),
                rule_id,
                issues,
            })
            .collect();

        let diagnosed_at = if snapshot.diagnosis_time > 0 {
            chrono::DateTime::from_timestamp_millis(snapshot.diagnosis_time)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        } else {
            String::new()
        };

        Self {
            health_score: snapshot.health_score,
            score_class: score_class(snapshot.health_score),
            atom_count: snapshot.atom_count,
            connection_density: snapshot.connection_density,
            density_summary: snapshot.connection_density.to_string(),
            diagnosed_at,
            summary: IssueSummary::from_issues(&visible),
            ignored: snapshot.issues.len() - visible.len(),
            rules,
            language,
        }
    }
}

/// Render a report in the specified format
pub fn report(report: &DiagnosisReport, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(report, fmt)
}

/// Render a report using an OutputFormat enum
pub fn report_with_format(report: &DiagnosisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Severity, Span};

    /// A snapshot with one visible and one ignored issue
    pub(crate) fn test_snapshot() -> DiagnosisSnapshot {
        let issue = |id: &str, rule: &str, ignored: bool| DiagnosticIssue {
            id: id.into(),
            rule_id: rule.into(),
            file_path: "notes/a.md".into(),
            file_name: "a.md".into(),
            context_preview: "see [[b]]".into(),
            position: Span::new(4, 9),
            severity: Severity::Low,
            is_ignored: ignored,
        };
        DiagnosisSnapshot {
            issues: vec![
                issue("naked-links-notes/a.md-4", "naked-links", false),
                issue("graph-connectivity-notes/a.md-leaf", "graph-connectivity", true),
            ],
            health_score: 98,
            atom_count: 3,
            connection_density: ConnectionDensity {
                inbound: 1.0,
                outbound: 1.5,
                documents: 2,
            },
            diagnosis_time: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_report_hides_ignored() {
        let report = DiagnosisReport::new(&test_snapshot(), Language::En);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].name, "Naked Links");
        assert_eq!(report.score_class, ScoreClass::Healthy);
        assert!(report.diagnosed_at.starts_with("2023-11-14"));
    }
}
