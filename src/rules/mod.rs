//! Diagnostic rules for a note vault
//!
//! # Available Rules
//!
//! - `MetadataIntegrityRule`: front matter present with the required fields
//! - `NoteAtomicityRule`: note length and heading structure
//! - `NakedLinksRule`: internal links without explanatory context
//! - `GraphConnectivityRule`: isolated notes and dead-end notes
//! - `PredicateConsistencyRule`: rare or near-duplicate `label::` predicates

pub mod base;
pub mod corpus;
pub mod graph_connectivity;
pub mod metadata_integrity;
pub mod naked_links;
pub mod note_atomicity;
pub mod predicate_consistency;
pub mod registry;

pub use base::{Rule, RuleResult, RunSummary};
pub use corpus::{Corpus, CorpusEntry};
pub use graph_connectivity::GraphConnectivityRule;
pub use metadata_integrity::MetadataIntegrityRule;
pub use naked_links::NakedLinksRule;
pub use note_atomicity::NoteAtomicityRule;
pub use predicate_consistency::{is_similar, levenshtein, PredicateConsistencyRule};
pub use registry::{RuleFactory, RuleRegistry};

use crate::config::{
    Language, GRAPH_CONNECTIVITY, METADATA_INTEGRITY, NAKED_LINKS, NOTE_ATOMICITY,
    PREDICATE_CONSISTENCY,
};

/// Localized display name for a rule ID; unknown IDs are shown as-is
pub fn display_name(rule_id: &str, language: Language) -> String {
    let (en, zh) = match rule_id {
        METADATA_INTEGRITY => ("Metadata Integrity", "元数据完整性"),
        NOTE_ATOMICITY => ("Note Atomicity", "笔记原子化程度"),
        NAKED_LINKS => ("Naked Links", "裸链接"),
        GRAPH_CONNECTIVITY => ("Graph Connectivity", "知识图谱连接性"),
        PREDICATE_CONSISTENCY => ("Predicate Consistency", "关系谓语一致性"),
        other => return other.to_string(),
    };
    language.pick(en.to_string(), zh.to_string())
}
