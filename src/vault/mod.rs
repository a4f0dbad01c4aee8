//! Document store abstraction for rules
//!
//! Rules never walk the filesystem themselves. They receive a
//! [`DocumentStore`] that supplies the note list, lazily read content, the
//! per-note metadata index and the resolved link graph. [`FsVault`] serves a
//! directory of markdown notes; [`MemoryVault`] serves tests and embedding.

pub mod frontmatter;
pub mod fs;
pub mod memory;
pub mod parse;

pub use frontmatter::{Frontmatter, TagField};
pub use fs::FsVault;
pub use memory::MemoryVault;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a document store
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A note known to the store, identified by its vault-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    /// Vault-relative path with `/` separators, e.g. `notes/rust.md`
    pub path: String,
    /// File name including extension
    pub name: String,
    /// Last modification time, epoch milliseconds
    pub mtime: i64,
}

impl Document {
    pub fn new(path: impl Into<String>, mtime: i64) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self { path, name, mtime }
    }

    /// File name without the `.md` extension
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".md").unwrap_or(&self.name)
    }

    /// Parent folder, empty for notes at the vault root
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

/// Half-open character span of a link or heading in the raw content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

/// An outbound reference found in a note body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link target without `#fragment` or `|alias`
    pub target: String,
    /// Alias or label text, when written
    pub display: Option<String>,
    /// The literal link text as written, e.g. `[[target|alias]]`
    pub original: String,
    pub position: Position,
}

impl Link {
    /// Internal links point into the vault rather than at a URL
    pub fn is_internal(&self) -> bool {
        !self.target.contains("://") && !self.target.starts_with("mailto:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
    /// Zero-based line number
    pub line: usize,
}

/// Metadata index of one note
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteMetadata {
    pub frontmatter: Option<Frontmatter>,
    /// `[[wiki]]` and internal `[label](target)` links
    pub links: Vec<Link>,
    /// `![[embed]]` references
    pub embeds: Vec<Link>,
    pub headings: Vec<Heading>,
}

impl NoteMetadata {
    /// Raw `tags` value from the front matter
    pub fn tag_field(&self) -> Option<TagField> {
        self.frontmatter.as_ref().and_then(Frontmatter::tags)
    }
}

/// Resolved link graph: source path -> target path -> link count
pub type LinkGraph = HashMap<String, HashMap<String, usize>>;

/// Trait for supplying notes and their metadata to rules.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// rayon's parallel rule execution.
pub trait DocumentStore: Send + Sync {
    /// All markdown notes known to the store. Order is not significant.
    fn list_documents(&self) -> Vec<Document>;

    /// Read (or return cached) raw content.
    fn read_content(&self, doc: &Document) -> Result<Arc<String>, VaultError>;

    /// Metadata index for a note, `None` when the store has no index for it.
    fn metadata(&self, doc: &Document) -> Option<Arc<NoteMetadata>>;

    /// Resolved link graph over all notes.
    fn resolved_links(&self) -> LinkGraph;

    /// Look a note up by vault-relative path.
    fn document(&self, path: &str) -> Option<Document> {
        self.list_documents().into_iter().find(|d| d.path == path)
    }
}

/// Resolve link targets the way the filesystem vault does: an exact path,
/// the path with `.md` appended, or else a unique file stem.
pub fn resolve_links(docs: &[(Document, Arc<NoteMetadata>)]) -> LinkGraph {
    let mut by_path: HashMap<&str, &str> = HashMap::new();
    let mut by_stem: HashMap<String, Vec<&str>> = HashMap::new();
    for (doc, _) in docs {
        by_path.insert(doc.path.as_str(), doc.path.as_str());
        by_stem
            .entry(doc.stem().to_lowercase())
            .or_default()
            .push(doc.path.as_str());
    }

    let resolve = |target: &str| -> Option<String> {
        let target = target.trim_start_matches('/');
        if target.is_empty() {
            return None;
        }
        if let Some(path) = by_path.get(target) {
            return Some(path.to_string());
        }
        let with_ext = format!("{target}.md");
        if let Some(path) = by_path.get(with_ext.as_str()) {
            return Some(path.to_string());
        }
        let stem = target.rsplit('/').next().unwrap_or(target);
        let stem = stem.strip_suffix(".md").unwrap_or(stem).to_lowercase();
        match by_stem.get(&stem) {
            Some(paths) if paths.len() == 1 => Some(paths[0].to_string()),
            _ => None,
        }
    };

    let mut graph = LinkGraph::new();
    for (doc, meta) in docs {
        let mut targets: HashMap<String, usize> = HashMap::new();
        for link in meta.links.iter().chain(meta.embeds.iter()) {
            if !link.is_internal() {
                continue;
            }
            if let Some(resolved) = resolve(&link.target) {
                *targets.entry(resolved).or_insert(0) += 1;
            }
        }
        graph.insert(doc.path.clone(), targets);
    }
    graph
}
