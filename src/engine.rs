//! Rule execution engine with parallel support
//!
//! The RuleEngine runs every registered rule against one corpus snapshot:
//! - Instantiates fresh rules from the registry for each run
//! - Runs them in parallel on a rayon pool and waits for all to settle
//! - Isolates failures: an erroring or panicking rule contributes nothing
//! - Optionally narrows the output to notes modified since a timestamp
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  RuleEngine                  │
//! ├──────────────────────────────────────────────┤
//! │  1. Build corpus (exclusion, tag sets)       │
//! │  2. Instantiate rules from the registry      │
//! │  3. Run all rules in parallel (rayon)        │
//! │  4. Collect results in registration order    │
//! │  5. Filter to modified notes (incremental)   │
//! └──────────────────────────────────────────────┘
//! ```

use crate::config::Settings;
use crate::models::DiagnosticIssue;
use crate::rules::{Corpus, Rule, RuleRegistry, RuleResult, RunSummary};
use crate::vault::DocumentStore;
use anyhow::Result;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Progress callback: (rule id, completed, total)
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Which notes a run reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Full,
    /// Only notes whose mtime is strictly after `since` (epoch millis)
    Incremental { since: i64 },
}

/// Output of one engine run
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Flattened issues, rules in registration order
    pub issues: Vec<DiagnosticIssue>,
    pub results: Vec<RuleResult>,
    pub summary: RunSummary,
    /// Paths considered modified, for incremental runs
    pub modified: Option<HashSet<String>>,
}

/// Runs diagnostic rules over a document store
pub struct RuleEngine {
    registry: Arc<RuleRegistry>,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl RuleEngine {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
            .min(registry.len().max(1));
        Self {
            registry,
            workers,
            progress_callback: None,
        }
    }

    /// Number of worker threads (0 = auto-detect)
    pub fn with_workers(mut self, workers: usize) -> Self {
        if workers > 0 {
            self.workers = workers;
        }
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Run every registered rule.
    ///
    /// Rule failures are logged and recorded in the results; the run itself
    /// only fails if the worker pool cannot be built.
    pub fn run(&self, store: &dyn DocumentStore, settings: &Settings, mode: ScanMode) -> Result<RunOutput> {
        let start = Instant::now();
        let rules = self.registry.instantiate(settings);
        let corpus = Corpus::build(store, settings);
        info!(
            "Running {} rules over {} notes on {} workers",
            rules.len(),
            corpus.documents().len(),
            self.workers
        );

        let completed = AtomicUsize::new(0);
        let total = rules.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let results: Vec<RuleResult> = pool.install(|| {
            rules
                .par_iter()
                .map(|rule| {
                    let result = run_single_rule(rule, &corpus);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(rule.id(), done, total);
                    }
                    result
                })
                .collect()
        });

        let modified = match mode {
            ScanMode::Full => None,
            ScanMode::Incremental { since } => Some(
                store
                    .list_documents()
                    .into_iter()
                    .filter(|d| d.mtime > since)
                    .map(|d| d.path)
                    .collect::<HashSet<String>>(),
            ),
        };

        let mut summary = RunSummary::default();
        let mut issues = Vec::new();
        for result in &results {
            summary.add_result(result);
            if let Some(err) = &result.error {
                warn!("Rule {} failed: {}", result.rule_id, err);
            }
            match &modified {
                Some(paths) => issues.extend(
                    result
                        .issues
                        .iter()
                        .filter(|i| paths.contains(&i.file_path))
                        .cloned(),
                ),
                None => issues.extend(result.issues.iter().cloned()),
            }
        }

        if let Some(paths) = &modified {
            debug!("Incremental run: {} modified notes", paths.len());
        }
        info!(
            "Diagnosis complete: {} issues from {}/{} rules in {:?}",
            issues.len(),
            summary.rules_succeeded,
            summary.rules_run,
            start.elapsed()
        );

        Ok(RunOutput {
            issues,
            results,
            summary,
            modified,
        })
    }

    /// Run a single rule over the whole corpus; `None` for an unknown ID
    pub fn run_rule(&self, rule_id: &str, store: &dyn DocumentStore, settings: &Settings) -> Option<RuleResult> {
        let rule = self.registry.instantiate_one(rule_id, settings)?;
        let corpus = Corpus::build(store, settings);
        Some(run_single_rule(&rule, &corpus))
    }
}

/// Run a single rule with panic isolation and timing
fn run_single_rule(rule: &Arc<dyn Rule>, corpus: &Corpus) -> RuleResult {
    let id = rule.id().to_string();
    let start = Instant::now();
    debug!("Running rule: {}", id);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rule.check(corpus)));
    let duration = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(issues)) => {
            debug!("Rule {} found {} issues in {}ms", id, issues.len(), duration);
            RuleResult::success(id, issues, duration)
        }
        Ok(Err(e)) => RuleResult::failure(id, e.to_string(), duration),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            error!("Rule {} panicked: {}", id, panic_msg);
            RuleResult::failure(id, format!("Panic: {}", panic_msg), duration)
        }
    }
}
