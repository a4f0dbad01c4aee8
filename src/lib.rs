//! notehealth - diagnostics for a markdown knowledge vault
//!
//! Scans a vault of interlinked notes with a registry of heuristic rules,
//! rolls the findings into a weighted health score, and keeps a saved
//! snapshot that can be patched by single-note rechecks.

pub mod cli;
pub mod config;
pub mod engine;
pub mod export;
pub mod models;
pub mod recheck;
pub mod reporters;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod vault;

pub use engine::{RuleEngine, ScanMode};
pub use models::{DiagnosisSnapshot, DiagnosticIssue, Severity, Span};
pub use rules::{Rule, RuleRegistry};
pub use session::{FileStatus, Session};
