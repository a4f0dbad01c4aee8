//! The view of the vault a rule run sees
//!
//! Built once per run: the document list is read, exclusion is decided for
//! every note, and each note's tag set is normalized. Rules only ever see
//! the included notes.

use crate::config::Settings;
use crate::models::{DiagnosticIssue, Severity, Span};
use crate::vault::{Document, DocumentStore, NoteMetadata};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// An included note with its metadata index
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub doc: Document,
    pub metadata: Option<Arc<NoteMetadata>>,
    /// Normalized front-matter tags
    pub tags: BTreeSet<String>,
}

pub struct Corpus<'a> {
    store: &'a dyn DocumentStore,
    settings: &'a Settings,
    entries: Vec<CorpusEntry>,
    index: HashMap<String, usize>,
    excluded: HashSet<String>,
    ignored: HashSet<String>,
}

impl<'a> Corpus<'a> {
    pub fn build(store: &'a dyn DocumentStore, settings: &'a Settings) -> Self {
        let excluded_tags = settings.normalized_excluded_tags();
        let mut entries = Vec::new();
        let mut excluded = HashSet::new();

        for doc in store.list_documents() {
            let metadata = store.metadata(&doc);
            let tags = metadata
                .as_ref()
                .and_then(|m| m.tag_field())
                .map(|t| t.normalized())
                .unwrap_or_default();

            if settings.is_excluded_folder(&doc.path) || tags.iter().any(|t| excluded_tags.contains(t)) {
                excluded.insert(doc.path.clone());
                continue;
            }
            entries.push(CorpusEntry { doc, metadata, tags });
        }

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.doc.path.clone(), i))
            .collect();

        Self {
            store,
            settings,
            entries,
            index,
            excluded,
            ignored: settings.ignored_issues.iter().cloned().collect(),
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store
    }

    /// Included notes
    pub fn documents(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&CorpusEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    /// Whether `path` names a note the store knows but the settings exclude
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.contains(path) || self.settings.is_excluded_folder(path)
    }

    pub fn is_included(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Read a note's content; failures are logged and yield `None`
    pub fn read(&self, entry: &CorpusEntry) -> Option<Arc<String>> {
        match self.store.read_content(&entry.doc) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Skipping {}: {}", entry.doc.path, e);
                None
            }
        }
    }

    /// Build an issue with its ignore flag taken from the current settings
    pub fn issue(
        &self,
        rule_id: &str,
        doc: &Document,
        id: String,
        context_preview: String,
        position: Span,
        severity: Severity,
    ) -> DiagnosticIssue {
        DiagnosticIssue {
            is_ignored: self.ignored.contains(&id),
            id,
            rule_id: rule_id.to_string(),
            file_path: doc.path.clone(),
            file_name: doc.name.clone(),
            context_preview,
            position,
            severity,
        }
    }
}
