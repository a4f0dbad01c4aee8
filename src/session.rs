//! Diagnosis session
//!
//! The session owns the settings blob (and with it the saved snapshot) for
//! one vault. Every operation that changes it holds the lock for the whole
//! read-modify-write step and persists before returning, so concurrent
//! callers are serialized.

use crate::config::{Settings, SettingsStore};
use crate::engine::{RuleEngine, ScanMode};
use crate::export::{export_healthy, ExportSummary};
use crate::models::{DiagnosisSnapshot, DiagnosticIssue, Severity};
use crate::recheck::{merge_incremental, reconcile, RecheckOutcome};
use crate::rules::{display_name, Corpus, RuleRegistry, RunSummary};
use crate::scoring::{atom_count, connection_density, health_score};
use crate::vault::{DocumentStore, VaultError};
use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Result of a full or incremental diagnosis
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub snapshot: DiagnosisSnapshot,
    pub summary: RunSummary,
    /// Issues produced by this run (before merging, for incremental runs)
    pub new_issues: usize,
}

/// One-note status indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    Excluded,
    Healthy,
    /// First issue of the note
    Issue {
        rule_id: String,
        rule: String,
        severity: Severity,
        preview: String,
    },
}

pub struct Session {
    store: Arc<dyn DocumentStore>,
    settings_store: Arc<dyn SettingsStore>,
    engine: RuleEngine,
    settings: Mutex<Settings>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Session {
    /// Open a session with the settings currently in `settings_store`
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings_store: Arc<dyn SettingsStore>,
        registry: Arc<RuleRegistry>,
    ) -> Self {
        let settings = settings_store.load();
        Self::with_settings(store, settings_store, registry, settings)
    }

    /// Open a session with explicit starting settings (e.g. after a config overlay)
    pub fn with_settings(
        store: Arc<dyn DocumentStore>,
        settings_store: Arc<dyn SettingsStore>,
        registry: Arc<RuleRegistry>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            settings_store,
            engine: RuleEngine::new(registry),
            settings: Mutex::new(settings),
        }
    }

    /// Replace the engine, e.g. to set workers or a progress callback
    pub fn with_engine(mut self, engine: RuleEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        self.settings_store.save(settings)?;
        debug!("Settings persisted");
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.lock().clone()
    }

    pub fn snapshot(&self) -> Option<DiagnosisSnapshot> {
        self.lock().saved_diagnosis.clone()
    }

    /// Edit the settings and persist. An error from `edit` leaves them untouched.
    pub fn update_settings<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Settings) -> Result<T, crate::config::SettingsError>,
    {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let value = edit(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(value)
    }

    /// Recompute score and corpus statistics for an issue list
    fn build_snapshot(&self, settings: &Settings, issues: Vec<DiagnosticIssue>) -> DiagnosisSnapshot {
        let corpus = Corpus::build(self.store.as_ref(), settings);
        DiagnosisSnapshot {
            health_score: health_score(&issues, settings),
            atom_count: atom_count(&corpus),
            connection_density: connection_density(&corpus),
            diagnosis_time: now_millis(),
            issues,
        }
    }

    /// Scan the whole vault and replace the saved snapshot
    pub fn full_diagnosis(&self) -> Result<Diagnosis> {
        let mut settings = self.lock();
        let output = self.engine.run(self.store.as_ref(), &settings, ScanMode::Full)?;
        let new_issues = output.issues.len();

        let snapshot = self.build_snapshot(&settings, output.issues);
        settings.saved_diagnosis = Some(snapshot.clone());
        self.persist(&settings)?;

        info!("Full diagnosis: {} issues, score {}", new_issues, snapshot.health_score);
        Ok(Diagnosis {
            snapshot,
            summary: output.summary,
            new_issues,
        })
    }

    /// Scan notes modified since the last incremental run and merge them in
    pub fn incremental_diagnosis(&self) -> Result<Diagnosis> {
        let mut settings = self.lock();
        let since = settings.last_diagnosis_time;
        let output = self
            .engine
            .run(self.store.as_ref(), &settings, ScanMode::Incremental { since })?;
        let new_issues = output.issues.len();
        settings.last_diagnosis_time = now_millis();

        let issues = match &settings.saved_diagnosis {
            Some(saved) => {
                let existing: std::collections::HashSet<String> = self
                    .store
                    .list_documents()
                    .into_iter()
                    .map(|d| d.path)
                    .collect();
                merge_incremental(&saved.issues, output.issues, |p| existing.contains(p))
            }
            None => output.issues,
        };

        let snapshot = self.build_snapshot(&settings, issues);
        settings.saved_diagnosis = Some(snapshot.clone());
        self.persist(&settings)?;

        info!(
            "Incremental diagnosis since {}: {} new issues, score {}",
            since, new_issues, snapshot.health_score
        );
        Ok(Diagnosis {
            snapshot,
            summary: output.summary,
            new_issues,
        })
    }

    /// Add an issue to the ignore list. Returns false if already ignored.
    pub fn ignore_issue(&self, issue_id: &str) -> Result<bool> {
        self.set_ignored(issue_id, true)
    }

    /// Remove an issue from the ignore list. Returns false if it was not ignored.
    pub fn unignore_issue(&self, issue_id: &str) -> Result<bool> {
        self.set_ignored(issue_id, false)
    }

    fn set_ignored(&self, issue_id: &str, ignored: bool) -> Result<bool> {
        let mut settings = self.lock();
        let changed = if ignored {
            settings.ignore(issue_id)
        } else {
            settings.unignore(issue_id)
        };
        if !changed {
            return Ok(false);
        }

        let mut snapshot = settings.saved_diagnosis.take();
        if let Some(snapshot) = snapshot.as_mut() {
            for issue in snapshot.issues.iter_mut().filter(|i| i.id == issue_id) {
                issue.is_ignored = ignored;
            }
            snapshot.health_score = health_score(&snapshot.issues, &settings);
        }
        settings.saved_diagnosis = snapshot;
        self.persist(&settings)?;

        debug!("{} issue {}", if ignored { "Ignored" } else { "Unignored" }, issue_id);
        Ok(true)
    }

    /// Re-run one rule and reconcile its result for one note into the snapshot
    pub fn recheck(&self, path: &str, rule_id: &str) -> Result<RecheckOutcome> {
        if !self.engine.registry().contains(rule_id) {
            bail!("unknown rule '{}'", rule_id);
        }

        let mut settings = self.lock();
        let Some(saved) = settings.saved_diagnosis.clone() else {
            return Ok(RecheckOutcome::Unchanged);
        };

        let reconciled = if self.store.document(path).is_none() {
            // Deleted since the last scan: whatever was saved is no longer an issue
            reconcile(&saved.issues, path, rule_id, &[])
        } else {
            let Some(result) = self.engine.run_rule(rule_id, self.store.as_ref(), &settings) else {
                bail!("unknown rule '{}'", rule_id);
            };
            if let Some(err) = result.error {
                bail!("rule {} failed: {}", rule_id, err);
            }
            reconcile(&saved.issues, path, rule_id, &result.issues)
        };

        let Some(issues) = reconciled.issues else {
            return Ok(reconciled.outcome);
        };
        let snapshot = self.build_snapshot(&settings, issues);
        let score = snapshot.health_score;
        settings.saved_diagnosis = Some(snapshot);
        self.persist(&settings)?;

        match &reconciled.outcome {
            RecheckOutcome::Fixed { .. } => {
                info!("Issue fixed for {} ({}), new health score: {}", path, rule_id, score)
            }
            RecheckOutcome::Updated { .. } => {
                info!("Issue updated for {} ({}), new health score: {}", path, rule_id, score)
            }
            RecheckOutcome::Unchanged => {}
        }
        Ok(reconciled.outcome)
    }

    /// Non-ignored issues for one note.
    ///
    /// Missing or excluded notes have none. With a saved snapshot its issues
    /// are used; otherwise every rule is run live.
    pub fn file_issues(&self, path: &str) -> Result<Vec<DiagnosticIssue>> {
        let settings = self.settings();
        if self.store.document(path).is_none() {
            return Ok(Vec::new());
        }
        if Corpus::build(self.store.as_ref(), &settings).is_excluded(path) {
            return Ok(Vec::new());
        }
        if let Some(saved) = &settings.saved_diagnosis {
            return Ok(saved.issues_for(path));
        }

        let output = self.engine.run(self.store.as_ref(), &settings, ScanMode::Full)?;
        Ok(output
            .issues
            .into_iter()
            .filter(|i| i.file_path == path && !i.is_ignored)
            .collect())
    }

    /// Status indicator for one note
    pub fn file_status(&self, path: &str) -> Result<FileStatus> {
        if self.store.document(path).is_none() {
            return Err(VaultError::NotFound(path.to_string()).into());
        }
        let settings = self.settings();
        if Corpus::build(self.store.as_ref(), &settings).is_excluded(path) {
            return Ok(FileStatus::Excluded);
        }

        let issues = self.file_issues(path)?;
        Ok(match issues.into_iter().next() {
            None => FileStatus::Healthy,
            Some(first) => FileStatus::Issue {
                rule: display_name(&first.rule_id, settings.language),
                rule_id: first.rule_id,
                severity: first.severity,
                preview: first.context_preview,
            },
        })
    }

    /// Run a fresh full scan and export the healthy notes
    pub fn export(&self) -> Result<ExportSummary> {
        let settings = self.settings();
        let output = self.engine.run(self.store.as_ref(), &settings, ScanMode::Full)?;
        Ok(export_healthy(self.store.as_ref(), &settings, &output.issues))
    }
}
