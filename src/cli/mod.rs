//! CLI command definitions and handlers

mod config;
mod diagnose;
mod export;
mod init;
mod status;

use crate::config::{load_vault_config, JsonSettingsStore, SettingsStore};
use crate::engine::{ProgressCallback, RuleEngine};
use crate::rules::RuleRegistry;
use crate::session::Session;
use crate::vault::FsVault;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// notehealth - diagnostics for a markdown knowledge vault
#[derive(Parser, Debug)]
#[command(name = "notehealth")]
#[command(
    version,
    about = "Health diagnostics for a markdown knowledge vault",
    long_about = "notehealth scans a folder of interlinked markdown notes for missing \
front matter, overlong notes, context-free links, unlinked islands and inconsistent \
relation predicates, and rolls the findings into a 0-100 health score.",
    after_help = "\
Examples:
  notehealth --vault ~/notes diagnose            Full diagnosis
  notehealth diagnose --incremental              Only notes changed since the last run
  notehealth status notes/rust.md                One-note status
  notehealth recheck notes/rust.md naked-links   Re-run one rule after a fix
  notehealth export -o healthy.jsonl             Export healthy notes"
)]
pub struct Cli {
    /// Path to the vault (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub vault: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: auto)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example notehealth.toml and the state directory
    Init,

    /// Diagnose the vault and save the result
    Diagnose {
        /// Only scan notes modified since the last incremental run
        #[arg(long)]
        incremental: bool,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with code 1 if the health score is below this value
        #[arg(long)]
        fail_under: Option<u32>,
    },

    /// Show the saved diagnosis without rescanning
    Report {
        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Re-run one rule for one note and update the saved diagnosis
    Recheck {
        /// Vault-relative note path
        path: String,
        /// Rule ID (see `notehealth rules`)
        rule: String,
    },

    /// Show the health status of one note
    Status {
        /// Vault-relative note path
        path: String,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Ignore an issue by ID
    Ignore { id: String },

    /// Stop ignoring an issue
    Unignore { id: String },

    /// Export healthy notes as JSONL
    Export {
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the registered rules
    Rules,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings as JSON
    Show,

    /// Set a value, e.g. `max_note_length 2000` or `weight.naked-links 3`
    Set { key: String, value: String },
}

/// Open the vault and its stored settings, with notehealth.toml applied
pub(crate) fn open_session(
    vault: &Path,
    workers: Option<usize>,
    progress: Option<ProgressCallback>,
) -> Result<Session> {
    let root = vault
        .canonicalize()
        .with_context(|| format!("Vault does not exist: {}", vault.display()))?;
    let store = Arc::new(FsVault::open(&root)?);
    let settings_store = Arc::new(JsonSettingsStore::for_vault(&root));

    let mut settings = settings_store.load();
    load_vault_config(&root).apply(&mut settings);

    let registry = Arc::new(RuleRegistry::with_builtin_rules());
    let mut engine = RuleEngine::new(Arc::clone(&registry));
    if let Some(workers) = workers {
        engine = engine.with_workers(workers);
    }
    if let Some(progress) = progress {
        engine = engine.with_progress_callback(progress);
    }

    Ok(Session::with_settings(store, settings_store, registry, settings).with_engine(engine))
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => init::run(&cli.vault),

        Commands::Diagnose {
            incremental,
            format,
            output,
            fail_under,
        } => diagnose::run(
            &cli.vault,
            cli.workers,
            incremental,
            &format,
            output.as_deref(),
            fail_under,
        ),

        Commands::Report { format } => diagnose::report(&cli.vault, &format),

        Commands::Recheck { path, rule } => status::recheck(&cli.vault, cli.workers, &path, &rule),

        Commands::Status { path, format } => status::run(&cli.vault, cli.workers, &path, &format),

        Commands::Ignore { id } => status::set_ignored(&cli.vault, &id, true),

        Commands::Unignore { id } => status::set_ignored(&cli.vault, &id, false),

        Commands::Export { output } => export::run(&cli.vault, cli.workers, output.as_deref()),

        Commands::Config { action } => match action {
            ConfigAction::Show => config::show(&cli.vault),
            ConfigAction::Set { key, value } => config::set(&cli.vault, &key, &value),
        },

        Commands::Rules => config::rules(&cli.vault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("8"), Ok(8));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notehealth",
            "diagnose",
            "--incremental",
            "--vault",
            "/tmp/v",
            "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.vault, PathBuf::from("/tmp/v"));
        match cli.command {
            Commands::Diagnose { incremental, format, .. } => {
                assert!(incremental);
                assert_eq!(format, "json");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["notehealth", "diagnose", "--format", "sarif"]).is_err());
    }

    #[test]
    fn test_config_set_parses() {
        let cli = Cli::try_parse_from(["notehealth", "config", "set", "weight.naked-links", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Set { .. } }
        ));
    }
}
