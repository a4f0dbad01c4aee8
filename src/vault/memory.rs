//! In-memory document store
//!
//! Notes are indexed with the same parser as [`super::FsVault`], so rules see
//! identical metadata whichever store backs them.

use super::parse::index_note;
use super::{resolve_links, Document, DocumentStore, LinkGraph, NoteMetadata, VaultError};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
struct Note {
    doc: Document,
    content: Arc<String>,
    metadata: Arc<NoteMetadata>,
}

#[derive(Debug, Default)]
struct Inner {
    notes: BTreeMap<String, Note>,
    unreadable: HashSet<String>,
}

/// Mutable in-memory vault. Interior mutability lets tests edit notes
/// while a session holds the store.
#[derive(Debug, Default)]
pub struct MemoryVault {
    inner: RwLock<Inner>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, content)` pairs, all with mtime 0
    pub fn with_notes(entries: Vec<(&str, &str)>) -> Self {
        let vault = Self::new();
        for (path, content) in entries {
            vault.insert(path, content);
        }
        vault
    }

    /// Add a note with mtime 0
    pub fn note(self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a note, keeping its previous mtime
    pub fn insert(&self, path: &str, content: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mtime = inner.notes.get(path).map(|n| n.doc.mtime).unwrap_or(0);
        inner.notes.insert(
            path.to_string(),
            Note {
                doc: Document::new(path, mtime),
                content: Arc::new(content.to_string()),
                metadata: Arc::new(index_note(content)),
            },
        );
    }

    pub fn set_mtime(&self, path: &str, mtime: i64) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(note) = inner.notes.get_mut(path) {
            note.doc.mtime = mtime;
        }
    }

    /// Make reads of `path` fail with an I/O error
    pub fn fail_reads(&self, path: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.unreadable.insert(path.to_string());
    }

    pub fn remove(&self, path: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.notes.remove(path).is_some()
    }

    fn snapshot(&self) -> Vec<Note> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.notes.values().cloned().collect()
    }
}

impl DocumentStore for MemoryVault {
    fn list_documents(&self) -> Vec<Document> {
        self.snapshot().into_iter().map(|n| n.doc).collect()
    }

    fn read_content(&self, doc: &Document) -> Result<Arc<String>, VaultError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.unreadable.contains(&doc.path) {
            return Err(VaultError::Io {
                path: PathBuf::from(&doc.path),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read refused"),
            });
        }
        inner
            .notes
            .get(&doc.path)
            .map(|n| Arc::clone(&n.content))
            .ok_or_else(|| VaultError::NotFound(doc.path.clone()))
    }

    fn metadata(&self, doc: &Document) -> Option<Arc<NoteMetadata>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.notes.get(&doc.path).map(|n| Arc::clone(&n.metadata))
    }

    fn resolved_links(&self) -> LinkGraph {
        let docs: Vec<(Document, Arc<NoteMetadata>)> = self
            .snapshot()
            .into_iter()
            .map(|n| (n.doc, n.metadata))
            .collect();
        resolve_links(&docs)
    }

    fn document(&self, path: &str) -> Option<Document> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.notes.get(path).map(|n| n.doc.clone())
    }
}
