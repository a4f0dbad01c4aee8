//! Diagnosis settings
//!
//! The settings blob carries the rule configuration, the ignore list, the
//! incremental-scan watermark and the saved diagnosis snapshot. It is read by
//! every rule during a run and only written between runs by the session.

use crate::models::DiagnosisSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Rule IDs of the built-in rules, as used in the weight table
pub const METADATA_INTEGRITY: &str = "metadata-integrity";
pub const NOTE_ATOMICITY: &str = "note-atomicity";
pub const NAKED_LINKS: &str = "naked-links";
pub const GRAPH_CONNECTIVITY: &str = "graph-connectivity";
pub const PREDICATE_CONSISTENCY: &str = "predicate-consistency";

const DEFAULT_EXPORT_TEMPLATE: &str = r#"{"instruction": "Generate knowledge graph nodes and relations from the following note", "input": {"content": {{content}}, "fileName": {{fileName}}, "filePath": {{filePath}}, "frontmatter": {{frontmatter}}}, "output": {"tags": {{tags}}, "type": {{type}}, "links": {{links}}, "headings": {{headings}}}}"#;

/// Errors raised at the settings boundary
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("'{value}' is not a valid number for {key}")]
    InvalidNumber { key: String, value: String },

    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings could not be parsed: {0}")]
    Parse(String),
}

/// Language used for issue previews and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn is_english(&self) -> bool {
        matches!(self, Language::En)
    }

    /// Pick the message for this language
    pub fn pick(&self, en: String, zh: String) -> String {
        match self {
            Language::En => en,
            Language::Zh => zh,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "chinese" => Ok(Language::Zh),
            other => Err(SettingsError::Parse(format!("unknown language '{other}'"))),
        }
    }
}

/// Full settings blob, persisted through a [`super::SettingsStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub required_metadata_fields: Vec<String>,
    pub max_note_length: usize,
    pub min_context_length: usize,
    pub excluded_folders: Vec<String>,
    pub excluded_tags: Vec<String>,
    pub ignored_issues: Vec<String>,
    pub export_template: String,
    pub knowledge_atom_types: Vec<String>,
    pub language: Language,
    /// Penalty per issue occurrence, keyed by rule ID
    pub rule_weights: BTreeMap<String, f64>,
    /// Epoch milliseconds of the last incremental diagnosis
    pub last_diagnosis_time: i64,
    pub predicate_usage_threshold: usize,
    pub saved_diagnosis: Option<DiagnosisSnapshot>,
}

impl Default for Settings {
    fn default() -> Self {
        let rule_weights = [
            (METADATA_INTEGRITY, 5.0),
            (NAKED_LINKS, 2.0),
            (GRAPH_CONNECTIVITY, 1.0),
            (NOTE_ATOMICITY, 0.8),
            (PREDICATE_CONSISTENCY, 0.5),
            ("word-count-exceed", 0.1),
        ]
        .into_iter()
        .map(|(id, w)| (id.to_string(), w))
        .collect();

        Self {
            required_metadata_fields: strings(&["type", "status", "domain"]),
            max_note_length: 1500,
            min_context_length: 50,
            excluded_folders: Vec::new(),
            excluded_tags: Vec::new(),
            ignored_issues: Vec::new(),
            export_template: DEFAULT_EXPORT_TEMPLATE.to_string(),
            knowledge_atom_types: strings(&["atom", "concept", "entity"]),
            language: Language::En,
            rule_weights,
            last_diagnosis_time: 0,
            predicate_usage_threshold: 1,
            saved_diagnosis: None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Split a comma-separated settings value, dropping blanks
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|_| SettingsError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Normalize a tag for comparison: strip one leading `#`, lowercase
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim();
    tag.strip_prefix('#').unwrap_or(tag).to_lowercase()
}

impl Settings {
    /// Weight for a rule; unknown rules weigh nothing
    pub fn weight(&self, rule_id: &str) -> f64 {
        self.rule_weights.get(rule_id).copied().unwrap_or(0.0)
    }

    /// Predicate threshold as applied by the rule (0 falls back to 1)
    pub fn effective_predicate_threshold(&self) -> usize {
        if self.predicate_usage_threshold == 0 {
            1
        } else {
            self.predicate_usage_threshold
        }
    }

    pub fn ignored_set(&self) -> HashSet<&str> {
        self.ignored_issues.iter().map(String::as_str).collect()
    }

    pub fn is_ignored(&self, issue_id: &str) -> bool {
        self.ignored_issues.iter().any(|id| id == issue_id)
    }

    /// Excluded tags after normalization
    pub fn normalized_excluded_tags(&self) -> BTreeSet<String> {
        self.excluded_tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Whether `path` lies in one of the excluded folders
    pub fn is_excluded_folder(&self, path: &str) -> bool {
        self.excluded_folders.iter().any(|folder| {
            let folder = folder.trim().trim_end_matches('/');
            if folder.is_empty() {
                return false;
            }
            path == folder
                || path
                    .strip_prefix(folder)
                    .map(|rest| rest.starts_with('/'))
                    .unwrap_or(false)
        })
    }

    /// Apply a raw string value to a named setting.
    ///
    /// Invalid values are rejected and the previous value is kept.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        match key {
            "required_metadata_fields" | "required_fields" => {
                self.required_metadata_fields = split_list(raw)
            }
            "max_note_length" => self.max_note_length = parse_number(key, raw)?,
            "min_context_length" => self.min_context_length = parse_number(key, raw)?,
            "excluded_folders" => self.excluded_folders = split_list(raw),
            "excluded_tags" => self.excluded_tags = split_list(raw),
            "knowledge_atom_types" => self.knowledge_atom_types = split_list(raw),
            "predicate_usage_threshold" => {
                self.predicate_usage_threshold = parse_number(key, raw)?
            }
            "language" => self.language = raw.parse()?,
            "export_template" => self.export_template = raw.to_string(),
            _ => {
                let Some(rule_id) = key.strip_prefix("weight.") else {
                    return Err(SettingsError::UnknownKey(key.to_string()));
                };
                let weight: f64 = parse_number(key, raw)?;
                if !weight.is_finite() {
                    return Err(SettingsError::InvalidNumber {
                        key: key.to_string(),
                        value: raw.to_string(),
                    });
                }
                self.rule_weights.insert(rule_id.to_string(), weight);
            }
        }
        Ok(())
    }

    /// Add an issue ID to the ignore list (no duplicates)
    pub fn ignore(&mut self, issue_id: &str) -> bool {
        if self.is_ignored(issue_id) {
            return false;
        }
        self.ignored_issues.push(issue_id.to_string());
        true
    }

    /// Remove an issue ID from the ignore list
    pub fn unignore(&mut self, issue_id: &str) -> bool {
        let before = self.ignored_issues.len();
        self.ignored_issues.retain(|id| id != issue_id);
        before != self.ignored_issues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.required_metadata_fields, vec!["type", "status", "domain"]);
        assert_eq!(settings.max_note_length, 1500);
        assert_eq!(settings.min_context_length, 50);
        assert_eq!(settings.weight(METADATA_INTEGRITY), 5.0);
        assert_eq!(settings.weight("no-such-rule"), 0.0);
        assert_eq!(settings.predicate_usage_threshold, 1);
    }

    #[test]
    fn test_partial_blob_defaults_missing_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{"max_note_length": 900}"#).expect("parse settings");
        assert_eq!(settings.max_note_length, 900);
        assert_eq!(settings.min_context_length, 50);
        assert!(settings.saved_diagnosis.is_none());
    }

    #[test]
    fn test_invalid_number_keeps_previous_value() {
        let mut settings = Settings::default();
        let err = settings.set_value("max_note_length", "lots").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidNumber { .. }));
        assert_eq!(settings.max_note_length, 1500);

        settings.set_value("max_note_length", " 2000 ").unwrap();
        assert_eq!(settings.max_note_length, 2000);
    }

    #[test]
    fn test_set_lists_and_weights() {
        let mut settings = Settings::default();
        settings.set_value("excluded_tags", "#Draft, private ,").unwrap();
        assert_eq!(settings.excluded_tags, vec!["#Draft", "private"]);

        settings.set_value("weight.naked-links", "3.5").unwrap();
        assert_eq!(settings.weight(NAKED_LINKS), 3.5);

        assert!(settings.set_value("weight.naked-links", "NaN").is_err());
        assert_eq!(settings.weight(NAKED_LINKS), 3.5);

        assert!(matches!(
            settings.set_value("bogus", "1"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_tag_normalization() {
        let mut settings = Settings::default();
        settings.excluded_tags = vec!["#Draft".into(), "ARCHIVE".into()];
        let tags = settings.normalized_excluded_tags();
        assert!(tags.contains("draft"));
        assert!(tags.contains("archive"));
        assert_eq!(normalize_tag("#Foo"), "foo");
    }

    #[test]
    fn test_excluded_folder_matches_on_boundary() {
        let mut settings = Settings::default();
        settings.excluded_folders = vec!["templates/".into()];
        assert!(settings.is_excluded_folder("templates/daily.md"));
        assert!(settings.is_excluded_folder("templates"));
        assert!(!settings.is_excluded_folder("templates-old/a.md"));
        assert!(!settings.is_excluded_folder("notes/a.md"));
    }

    #[test]
    fn test_ignore_unignore() {
        let mut settings = Settings::default();
        assert!(settings.ignore("x"));
        assert!(!settings.ignore("x"));
        assert!(settings.is_ignored("x"));
        assert!(settings.unignore("x"));
        assert!(!settings.unignore("x"));
    }
}
