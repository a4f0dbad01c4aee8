//! Snapshot reconciliation
//!
//! Patches a saved issue list with fresh results instead of replacing it:
//! a single-rule recheck of one note, and the merge step of an incremental
//! diagnosis.

use crate::models::DiagnosticIssue;
use serde::Serialize;
use std::collections::HashSet;

/// What a recheck did to the saved snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecheckOutcome {
    /// The saved issue no longer reproduces and was removed
    Fixed { removed: DiagnosticIssue },
    /// The issue still reproduces; its details were refreshed
    Updated { issue: DiagnosticIssue },
    /// Nothing was saved for this note and rule
    Unchanged,
}

/// Result of reconciling one (path, rule) pair
#[derive(Debug)]
pub struct Reconciled {
    pub outcome: RecheckOutcome,
    /// The patched issue list, `None` when nothing changed
    pub issues: Option<Vec<DiagnosticIssue>>,
}

/// Reconcile a fresh single-rule scan into the saved issues.
///
/// `fresh` is the rule's full output; only non-ignored issues for `path`
/// are considered. The saved, non-ignored issues for (path, rule) form a
/// group. A group member whose ID reproduces takes the fresh details. The
/// remaining members are paired in order with fresh issues whose IDs are
/// not saved yet (offsets shifted), and members left without a partner are
/// removed. Fresh issues beyond that are left for the next diagnosis. The
/// outcome reports what happened to the first member.
pub fn reconcile(
    saved: &[DiagnosticIssue],
    path: &str,
    rule_id: &str,
    fresh: &[DiagnosticIssue],
) -> Reconciled {
    let in_group = |i: &DiagnosticIssue| i.file_path == path && i.rule_id == rule_id && !i.is_ignored;

    let Some(old) = saved.iter().find(|&i| in_group(i)) else {
        return Reconciled {
            outcome: RecheckOutcome::Unchanged,
            issues: None,
        };
    };

    let saved_ids: HashSet<&str> = saved.iter().map(|i| i.id.as_str()).collect();
    let current: Vec<&DiagnosticIssue> = fresh
        .iter()
        .filter(|i| i.file_path == path && !i.is_ignored)
        .collect();
    let mut shifted = current
        .iter()
        .copied()
        .filter(|i| !saved_ids.contains(i.id.as_str()));

    let mut outcome = None;
    let mut issues = Vec::with_capacity(saved.len());
    for issue in saved {
        if !in_group(issue) {
            issues.push(issue.clone());
            continue;
        }
        let replacement = current
            .iter()
            .copied()
            .find(|i| i.id == issue.id)
            .or_else(|| shifted.next())
            .cloned();
        if issue.id == old.id {
            outcome = Some(match &replacement {
                Some(refreshed) => RecheckOutcome::Updated { issue: refreshed.clone() },
                None => RecheckOutcome::Fixed { removed: old.clone() },
            });
        }
        issues.extend(replacement);
    }

    Reconciled {
        outcome: outcome.unwrap_or(RecheckOutcome::Unchanged),
        issues: Some(issues),
    }
}

/// Merge an incremental scan into the saved issues.
///
/// Saved issues survive while their note still exists; fresh issues are
/// appended unless their ID is already present.
pub fn merge_incremental<F>(saved: &[DiagnosticIssue], fresh: Vec<DiagnosticIssue>, exists: F) -> Vec<DiagnosticIssue>
where
    F: Fn(&str) -> bool,
{
    let mut merged: Vec<DiagnosticIssue> = saved
        .iter()
        .filter(|i| exists(&i.file_path))
        .cloned()
        .collect();
    let mut seen: HashSet<String> = merged.iter().map(|i| i.id.clone()).collect();

    for issue in fresh {
        if seen.insert(issue.id.clone()) {
            merged.push(issue);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, Span};

    fn make_issue(rule: &str, path: &str, id_suffix: &str) -> DiagnosticIssue {
        DiagnosticIssue {
            id: format!("{rule}-{path}{id_suffix}"),
            rule_id: rule.to_string(),
            file_path: path.to_string(),
            file_name: path.to_string(),
            severity: Severity::Low,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_issue_is_removed() {
        let saved = vec![make_issue("naked-links", "a.md", "-3"), make_issue("naked-links", "b.md", "-3")];
        let result = reconcile(&saved, "a.md", "naked-links", &[make_issue("naked-links", "b.md", "-3")]);

        assert!(matches!(result.outcome, RecheckOutcome::Fixed { .. }));
        let issues = result.issues.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file_path, "b.md");
    }

    #[test]
    fn test_shifted_issue_is_replaced_in_place() {
        let saved = vec![make_issue("naked-links", "a.md", "-3"), make_issue("graph-connectivity", "a.md", "-leaf")];
        let mut moved = make_issue("naked-links", "a.md", "-9");
        moved.position = Span::new(9, 14);

        let result = reconcile(&saved, "a.md", "naked-links", &[moved.clone()]);
        assert_eq!(result.outcome, RecheckOutcome::Updated { issue: moved.clone() });
        let issues = result.issues.unwrap();
        assert_eq!(issues[0], moved);
        assert_eq!(issues[1].rule_id, "graph-connectivity");
    }

    #[test]
    fn test_same_id_preferred_over_first() {
        let saved = vec![make_issue("naked-links", "a.md", "-9")];
        let fresh = vec![make_issue("naked-links", "a.md", "-3"), make_issue("naked-links", "a.md", "-9")];
        let result = reconcile(&saved, "a.md", "naked-links", &fresh);
        match result.outcome {
            RecheckOutcome::Updated { issue } => assert_eq!(issue.id, "naked-links-a.md-9"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_fixing_one_of_two_keeps_ids_unique() {
        let saved = vec![
            make_issue("naked-links", "a.md", "-3"),
            make_issue("naked-links", "a.md", "-76"),
            make_issue("graph-connectivity", "a.md", "-leaf"),
        ];
        let fresh = vec![make_issue("naked-links", "a.md", "-76")];
        let result = reconcile(&saved, "a.md", "naked-links", &fresh);

        assert!(matches!(result.outcome, RecheckOutcome::Fixed { ref removed } if removed.id == "naked-links-a.md-3"));
        let ids: Vec<String> = result.issues.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["naked-links-a.md-76", "graph-connectivity-a.md-leaf"]);
    }

    #[test]
    fn test_fix_with_shifted_offsets_drops_stale_issue() {
        let saved = vec![make_issue("naked-links", "a.md", "-3"), make_issue("naked-links", "a.md", "-75")];
        let fresh = vec![make_issue("naked-links", "a.md", "-79")];
        let issues = reconcile(&saved, "a.md", "naked-links", &fresh).issues.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "naked-links-a.md-79");
    }

    #[test]
    fn test_new_fresh_issue_is_not_added() {
        let saved = vec![make_issue("naked-links", "a.md", "-9")];
        let fresh = vec![make_issue("naked-links", "a.md", "-3"), make_issue("naked-links", "a.md", "-9")];
        let issues = reconcile(&saved, "a.md", "naked-links", &fresh).issues.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "naked-links-a.md-9");
    }

    #[test]
    fn test_no_prior_issue_is_noop() {
        let saved = vec![make_issue("naked-links", "b.md", "-3")];
        let fresh = vec![make_issue("naked-links", "a.md", "-3")];
        let result = reconcile(&saved, "a.md", "naked-links", &fresh);
        assert_eq!(result.outcome, RecheckOutcome::Unchanged);
        assert!(result.issues.is_none());
    }

    #[test]
    fn test_ignored_saved_issue_is_not_rechecked() {
        let mut ignored = make_issue("naked-links", "a.md", "-3");
        ignored.is_ignored = true;
        let result = reconcile(&[ignored], "a.md", "naked-links", &[]);
        assert_eq!(result.outcome, RecheckOutcome::Unchanged);
    }

    #[test]
    fn test_merge_keeps_existing_and_dedups() {
        let saved = vec![make_issue("r", "a.md", ""), make_issue("r", "gone.md", "")];
        let fresh = vec![make_issue("r", "a.md", ""), make_issue("r", "b.md", "")];
        let merged = merge_incremental(&saved, fresh, |p| p != "gone.md");
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["r-a.md", "r-b.md"]);
    }
}
