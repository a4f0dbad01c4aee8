//! Per-note commands: status, recheck, ignore/unignore

use super::open_session;
use crate::models::Severity;
use crate::recheck::RecheckOutcome;
use crate::scoring::score_class;
use crate::session::FileStatus;
use anyhow::Result;
use console::style;
use std::path::Path;

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟠",
        Severity::Low => "🟡",
    }
}

pub fn run(vault: &Path, workers: Option<usize>, path: &str, format: &str) -> Result<()> {
    let session = open_session(vault, workers, None)?;
    let status = session.file_status(path)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let en = session.settings().language.is_english();
    match status {
        FileStatus::Excluded => println!(
            "{} {}",
            style("–").dim(),
            if en { "Excluded from diagnosis" } else { "已排除" }
        ),
        FileStatus::Healthy => println!(
            "✅ {}",
            style(if en { "Healthy Note" } else { "健康笔记" }).green()
        ),
        FileStatus::Issue {
            rule,
            severity,
            preview,
            ..
        } => {
            println!("{} {}", severity_icon(severity), style(rule).bold());
            println!("   {}", style(preview).dim());
        }
    }
    Ok(())
}

pub fn recheck(vault: &Path, workers: Option<usize>, path: &str, rule: &str) -> Result<()> {
    let session = open_session(vault, workers, None)?;
    let outcome = session.recheck(path, rule)?;
    let score = session.snapshot().map(|s| s.health_score);

    match outcome {
        RecheckOutcome::Fixed { removed } => {
            println!("{} Fixed: {}", style("✓").green(), style(removed.id).cyan());
        }
        RecheckOutcome::Updated { issue } => {
            println!("{} Still present: {}", style("!").yellow(), style(issue.id).cyan());
            println!("   {}", style(issue.context_preview).dim());
        }
        RecheckOutcome::Unchanged => {
            println!("{} No saved issue for {} ({})", style("–").dim(), path, rule);
        }
    }
    if let Some(score) = score {
        println!("Health score: {}% ({})", style(score).bold(), score_class(score));
    }
    Ok(())
}

pub fn set_ignored(vault: &Path, id: &str, ignored: bool) -> Result<()> {
    let session = open_session(vault, None, None)?;
    let changed = if ignored {
        session.ignore_issue(id)?
    } else {
        session.unignore_issue(id)?
    };

    let verb = if ignored { "Ignored" } else { "Unignored" };
    if changed {
        println!("{} {} {}", style("✓").green(), verb, style(id).cyan());
    } else {
        println!("{} Nothing to do for {}", style("–").dim(), style(id).cyan());
    }
    if let Some(snapshot) = session.snapshot() {
        println!("Health score: {}%", style(snapshot.health_score).bold());
    }
    Ok(())
}
