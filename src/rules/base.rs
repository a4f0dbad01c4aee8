//! Base rule trait and types
//!
//! This module defines the core abstractions for note diagnosis:
//! - `Rule` trait that all rules must implement
//! - `RuleResult` for capturing one rule's execution
//! - `RunSummary` aggregated over a run

use super::corpus::Corpus;
use crate::models::{DiagnosticIssue, Severity};
use anyhow::Result;
use std::collections::HashMap;

/// Result from running a single rule
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub rule_id: String,
    /// Issues produced; always empty for a failed rule
    pub issues: Vec<DiagnosticIssue>,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl RuleResult {
    pub fn success(rule_id: String, issues: Vec<DiagnosticIssue>, duration_ms: u64) -> Self {
        Self {
            rule_id,
            issues,
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(rule_id: String, error: String, duration_ms: u64) -> Self {
        Self {
            rule_id,
            issues: Vec::new(),
            duration_ms,
            success: false,
            error: Some(error),
        }
    }
}

/// Trait for all diagnostic rules
///
/// A rule is built fresh for every run from the current settings and must
/// not keep state between runs. It scans the whole corpus and reports
/// issues; documents the corpus excludes are never visible to it.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct EmptyNoteRule;
///
/// impl Rule for EmptyNoteRule {
///     fn id(&self) -> &'static str { "empty-note" }
///     fn name(&self) -> &'static str { "Empty note check" }
///     fn description(&self) -> &'static str { "Flags notes with no content" }
///
///     fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Stable identifier, used in issue IDs and the weight table
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// What this rule looks for
    fn description(&self) -> &'static str;

    /// Scan the corpus and return issues.
    ///
    /// Per-document read failures are logged and skipped by the corpus; an
    /// `Err` here discards the rule's output for the whole run.
    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>>;
}

/// Summary statistics from running all rules
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub rules_run: usize,
    pub rules_succeeded: usize,
    pub rules_failed: usize,
    pub total_issues: usize,
    pub by_severity: HashMap<Severity, usize>,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn add_result(&mut self, result: &RuleResult) {
        self.rules_run += 1;
        self.total_duration_ms += result.duration_ms;

        if result.success {
            self.rules_succeeded += 1;
            self.total_issues += result.issues.len();
            for issue in &result.issues {
                *self.by_severity.entry(issue.severity).or_insert(0) += 1;
            }
        } else {
            self.rules_failed += 1;
        }
    }
}
