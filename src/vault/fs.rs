//! Filesystem-backed document store
//!
//! Walks a vault directory for markdown notes and caches their content and
//! metadata. Cache entries are keyed by path and invalidated when the file's
//! modification time moves, so a long-lived vault sees edits on the next scan.

use super::parse::index_note;
use super::{resolve_links, Document, DocumentStore, LinkGraph, NoteMetadata, VaultError};
use crate::config::STATE_DIR;
use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Thread-safe vault over a directory of `*.md` files
pub struct FsVault {
    root: PathBuf,
    /// path -> (mtime, content)
    contents: DashMap<String, (i64, Arc<String>)>,
    /// path -> (mtime, metadata)
    metadata: DashMap<String, (i64, Arc<NoteMetadata>)>,
}

impl FsVault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VaultError::NotFound(root.display().to_string()));
        }
        Ok(Self {
            root,
            contents: DashMap::new(),
            metadata: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, doc: &Document) -> PathBuf {
        self.root.join(&doc.path)
    }

    /// Vault-relative path with `/` separators
    fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

fn mtime_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis())
        .unwrap_or(0)
}

impl DocumentStore for FsVault {
    fn list_documents(&self) -> Vec<Document> {
        let walker = ignore::WalkBuilder::new(&self.root)
            .git_ignore(true)
            .filter_entry(|e| e.file_name() != STATE_DIR)
            .build();

        let mut docs: Vec<Document> = walker
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                let path = self.relative_path(e.path())?;
                let mtime = e.metadata().map(|m| mtime_millis(&m)).unwrap_or(0);
                Some(Document::new(path, mtime))
            })
            .collect();

        docs.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Found {} notes under {}", docs.len(), self.root.display());
        docs
    }

    fn read_content(&self, doc: &Document) -> Result<Arc<String>, VaultError> {
        if let Some(entry) = self.contents.get(&doc.path) {
            if entry.0 == doc.mtime {
                return Ok(Arc::clone(&entry.1));
            }
        }

        let path = self.full_path(doc);
        let content = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                VaultError::NotFound(doc.path.clone())
            } else {
                VaultError::Io { path, source }
            }
        })?;
        let arc = Arc::new(content);
        self.contents
            .insert(doc.path.clone(), (doc.mtime, Arc::clone(&arc)));
        Ok(arc)
    }

    fn metadata(&self, doc: &Document) -> Option<Arc<NoteMetadata>> {
        if let Some(entry) = self.metadata.get(&doc.path) {
            if entry.0 == doc.mtime {
                return Some(Arc::clone(&entry.1));
            }
        }

        let content = match self.read_content(doc) {
            Ok(content) => content,
            Err(e) => {
                warn!("No metadata for {}: {}", doc.path, e);
                return None;
            }
        };
        let meta = Arc::new(index_note(&content));
        self.metadata
            .insert(doc.path.clone(), (doc.mtime, Arc::clone(&meta)));
        Some(meta)
    }

    fn resolved_links(&self) -> LinkGraph {
        let docs: Vec<(Document, Arc<NoteMetadata>)> = self
            .list_documents()
            .into_iter()
            .filter_map(|doc| {
                let meta = self.metadata(&doc)?;
                Some((doc, meta))
            })
            .collect();
        resolve_links(&docs)
    }

    fn document(&self, path: &str) -> Option<Document> {
        let full = self.root.join(path);
        let meta = std::fs::metadata(&full).ok()?;
        if !meta.is_file() || !path.to_lowercase().ends_with(".md") {
            return None;
        }
        Some(Document::new(path, mtime_millis(&meta)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_lists_markdown_relative_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "# A");
        write(dir.path(), "notes/b.md", "# B");
        write(dir.path(), "notes/image.png", "");
        write(dir.path(), ".notehealth/settings.json", "{}");

        let vault = FsVault::open(dir.path()).unwrap();
        let paths: Vec<String> = vault.list_documents().into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["a.md", "notes/b.md"]);

        let doc = vault.document("notes/b.md").unwrap();
        assert_eq!(doc.name, "b.md");
        assert!(doc.mtime > 0);
        assert!(vault.document("notes/image.png").is_none());
        assert!(vault.document("gone.md").is_none());
    }

    #[test]
    fn test_metadata_and_link_graph() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "---\ntype: atom\n---\nSee [[b]] and [[b]].");
        write(dir.path(), "b.md", "Back to [[a]].");

        let vault = FsVault::open(dir.path()).unwrap();
        let a = vault.document("a.md").unwrap();
        let meta = vault.metadata(&a).unwrap();
        assert!(meta.frontmatter.is_some());
        assert_eq!(meta.links.len(), 2);

        let graph = vault.resolved_links();
        assert_eq!(graph["a.md"].get("b.md"), Some(&2));
        assert_eq!(graph["b.md"].get("a.md"), Some(&1));
    }

    #[test]
    fn test_missing_file_read_is_not_found() {
        let dir = TempDir::new().unwrap();
        let vault = FsVault::open(dir.path()).unwrap();
        let err = vault.read_content(&Document::new("ghost.md", 0)).unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn test_open_missing_root_fails() {
        assert!(FsVault::open("/definitely/not/a/vault").is_err());
    }
}
