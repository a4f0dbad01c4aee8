//! Diagnose and report commands

use super::open_session;
use crate::engine::ProgressCallback;
use crate::reporters::{report_with_format, DiagnosisReport, OutputFormat};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::str::FromStr;

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("█▓▒░  ")
}

pub fn run(
    vault: &Path,
    workers: Option<usize>,
    incremental: bool,
    format: &str,
    output: Option<&Path>,
    fail_under: Option<u32>,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;

    // Progress goes to stderr and only for the text format
    let bar = (format == OutputFormat::Text).then(|| {
        let bar = ProgressBar::new(0);
        bar.set_style(create_bar_style());
        bar.set_message("Running rules...");
        bar
    });
    let progress: Option<ProgressCallback> = bar.clone().map(|bar| {
        Box::new(move |rule: &str, done: usize, total: usize| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
            bar.set_message(rule.to_string());
        }) as ProgressCallback
    });

    let session = open_session(vault, workers, progress)?;
    let diagnosis = if incremental {
        session.incremental_diagnosis()?
    } else {
        session.full_diagnosis()?
    };

    if let Some(bar) = bar {
        bar.finish_with_message(format!(
            "{}Ran {} rules, found {} issues",
            style("✓ ").green(),
            style(diagnosis.summary.rules_run).cyan(),
            style(diagnosis.new_issues).cyan(),
        ));
        if diagnosis.summary.rules_failed > 0 {
            eprintln!(
                "{} {} rule(s) failed; see logs with --log-level warn",
                style("!").yellow(),
                diagnosis.summary.rules_failed
            );
        }
    }

    let language = session.settings().language;
    let report = DiagnosisReport::new(&diagnosis.snapshot, language);
    write_output(&report_with_format(&report, format)?, output)?;

    if let Some(threshold) = fail_under {
        if diagnosis.snapshot.health_score < threshold {
            eprintln!(
                "{} Health score {} is below {}",
                style("✗").red(),
                diagnosis.snapshot.health_score,
                threshold
            );
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Print the saved snapshot
pub fn report(vault: &Path, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let session = open_session(vault, None, None)?;
    let Some(snapshot) = session.snapshot() else {
        println!(
            "No saved diagnosis. Run {} first.",
            style("notehealth diagnose").bold()
        );
        return Ok(());
    };
    let report = DiagnosisReport::new(&snapshot, session.settings().language);
    print!("{}", report_with_format(&report, format)?);
    Ok(())
}

pub(super) fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote {}", style("✓").green(), style(path.display()).cyan());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
