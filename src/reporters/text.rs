//! Text (terminal) reporter with colors and formatting

use super::DiagnosisReport;
use crate::models::{DiagnosticIssue, Severity};
use crate::scoring::ScoreClass;
use anyhow::Result;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Issues listed per rule before truncating
const MAX_ROWS: usize = 10;

fn class_color(class: ScoreClass) -> &'static str {
    match class {
        ScoreClass::Healthy => "\x1b[32m",  // Green
        ScoreClass::Warning => "\x1b[33m",  // Yellow
        ScoreClass::Critical => "\x1b[31m", // Red
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "\x1b[91m",   // Light red
        Severity::Medium => "\x1b[33m", // Yellow
        Severity::Low => "\x1b[34m",    // Blue
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "[H]",
        Severity::Medium => "[M]",
        Severity::Low => "[L]",
    }
}

/// Render report as formatted terminal output
pub fn render(report: &DiagnosisReport) -> Result<String> {
    let en = report.language.is_english();
    let mut out = String::new();

    let title = if en { "Vault Health" } else { "知识库健康度" };
    out.push_str(&format!("\n{BOLD}{title}{RESET}\n"));
    out.push_str(&format!("{DIM}──────────────────────────────────────{RESET}\n"));

    let color = class_color(report.score_class);
    let (score_label, atoms_label, density_label) = if en {
        ("Health Score", "Knowledge Atom Stats", "Connection Density")
    } else {
        ("健康度总分", "知识原子统计", "连接密度")
    };
    out.push_str(&format!(
        "{score_label}: {color}{BOLD}{}%{RESET}  {atoms_label}: {}  {density_label}: {}\n",
        report.health_score, report.atom_count, report.density_summary
    ));
    if !report.diagnosed_at.is_empty() {
        out.push_str(&format!("{DIM}{}{RESET}\n", report.diagnosed_at));
    }
    out.push('\n');

    if report.rules.is_empty() {
        let done = if en {
            "Congratulations! Your knowledge base is very healthy."
        } else {
            "恭喜！您的知识库非常健康。"
        };
        out.push_str(&format!("{done}\n"));
        return Ok(out);
    }

    let s = &report.summary;
    let mut parts = Vec::new();
    if s.high > 0 {
        parts.push(format!("\x1b[91m{} high{RESET}", s.high));
    }
    if s.medium > 0 {
        parts.push(format!("\x1b[33m{} medium{RESET}", s.medium));
    }
    if s.low > 0 {
        parts.push(format!("\x1b[34m{} low{RESET}", s.low));
    }
    out.push_str(&format!("{BOLD}ISSUES{RESET} ({} total)  {}", s.total, parts.join(" | ")));
    if report.ignored > 0 {
        out.push_str(&format!("  {DIM}{} ignored{RESET}", report.ignored));
    }
    out.push_str("\n\n");

    for group in &report.rules {
        out.push_str(&format!("{BOLD}{}{RESET} ({})\n", group.name, group.count));
        for issue in group.issues.iter().take(MAX_ROWS) {
            out.push_str(&format_row(issue));
        }
        let remaining = group.issues.len().saturating_sub(MAX_ROWS);
        if remaining > 0 {
            out.push_str(&format!("  {DIM}...and {remaining} more (use --format json){RESET}\n"));
        }
        out.push('\n');
    }

    Ok(out)
}

fn format_row(issue: &DiagnosticIssue) -> String {
    let sev_c = severity_color(issue.severity);
    let preview = single_line(&issue.context_preview, 60);
    let location = if issue.position.is_document_level() {
        issue.file_path.clone()
    } else {
        format!("{}:{}", issue.file_path, issue.position.start)
    };
    format!(
        "  {sev_c}{}{RESET}  {:<40}  {preview}\n  {DIM}     {}{RESET}\n",
        severity_tag(issue.severity),
        location,
        issue.id
    )
}

/// Collapse whitespace and truncate on a char boundary
fn single_line(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let head: String = flat.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Language;
    use crate::reporters::tests::test_snapshot;

    #[test]
    fn test_text_render_contains_groups() {
        let report = DiagnosisReport::new(&test_snapshot(), Language::En);
        let out = render(&report).unwrap();
        assert!(out.contains("Health Score"));
        assert!(out.contains("98%"));
        assert!(out.contains("Naked Links"));
        assert!(out.contains("notes/a.md:4"));
        assert!(out.contains("1 ignored"));
        assert!(!out.contains("Graph Connectivity"));
    }

    #[test]
    fn test_text_render_empty_zh() {
        let report = DiagnosisReport::new(&Default::default(), Language::Zh);
        let out = render(&report).unwrap();
        assert!(out.contains("恭喜"));
        assert!(out.contains("[↑ 0] [↓ 0]"));
    }

    #[test]
    fn test_single_line_truncates_multibyte() {
        let long = "概念".repeat(40);
        let line = single_line(&long, 10);
        assert_eq!(line.chars().count(), 10);
        assert!(line.ends_with("..."));
        assert_eq!(single_line("a\n  b", 10), "a b");
    }
}
