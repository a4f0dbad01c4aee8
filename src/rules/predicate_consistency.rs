//! Predicate consistency rule
//!
//! Relation predicates are written `label::` in note text. The rule counts
//! every predicate across the corpus, flags rarely used ones per occurrence,
//! and reports pairs whose spellings are close enough to be typos of each
//! other.

use super::base::Rule;
use super::corpus::Corpus;
use crate::config::{Language, PREDICATE_CONSISTENCY};
use crate::models::{issue_id, DiagnosticIssue, Severity, Span};
use crate::vault::parse::CharIndex;
use crate::vault::Document;
use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Characters captured on each side of a predicate for the preview
const PREVIEW_RADIUS: usize = 50;

/// Minimum normalized similarity for two predicates to be reported
const SIMILARITY_THRESHOLD: f64 = 0.7;

static PREDICATE: OnceLock<Regex> = OnceLock::new();

/// CJK ideographs plus ASCII word characters and hyphens; other scripts never form a predicate
fn predicate() -> &'static Regex {
    PREDICATE.get_or_init(|| Regex::new(r"([\x{4e00}-\x{9fa5}A-Za-z0-9_-]+)::").expect("valid regex"))
}

/// Edit distance over characters, so a CJK character counts as one unit
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / max_len >= 0.7`; two empty strings are similar
pub fn is_similar(a: &str, b: &str) -> bool {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return true;
    }
    let similarity = 1.0 - levenshtein(a, b) as f64 / max_len as f64;
    similarity >= SIMILARITY_THRESHOLD
}

#[derive(Debug, Clone)]
struct Location {
    doc: Document,
    span: Span,
    preview: String,
}

#[derive(Debug, Default)]
struct Usage {
    count: usize,
    locations: Vec<Location>,
}

pub struct PredicateConsistencyRule {
    usage_threshold: usize,
    language: Language,
}

impl PredicateConsistencyRule {
    /// A threshold of 0 behaves as 1
    pub fn new(usage_threshold: usize, language: Language) -> Self {
        Self {
            usage_threshold: usage_threshold.max(1),
            language,
        }
    }

    fn collect(&self, corpus: &Corpus) -> IndexMap<String, Usage> {
        let mut predicates: IndexMap<String, Usage> = IndexMap::new();

        for entry in corpus.documents() {
            let Some(content) = corpus.read(entry) else {
                continue;
            };
            let chars: Vec<char> = content.chars().collect();
            let index = CharIndex::new(&content);

            for caps in predicate().captures_iter(&content) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let start = index.char_offset(whole.start());
                let end = index.char_offset(whole.end());
                let from = start.saturating_sub(PREVIEW_RADIUS);
                let to = (end + PREVIEW_RADIUS).min(chars.len());

                let usage = predicates.entry(name.as_str().to_string()).or_default();
                usage.count += 1;
                usage.locations.push(Location {
                    doc: entry.doc.clone(),
                    span: Span::new(start, end),
                    preview: chars[from..to].iter().collect(),
                });
            }
        }

        predicates
    }
}

impl Rule for PredicateConsistencyRule {
    fn id(&self) -> &'static str {
        PREDICATE_CONSISTENCY
    }

    fn name(&self) -> &'static str {
        "Predicate consistency"
    }

    fn description(&self) -> &'static str {
        "Encourages consistent use of `key:: [[Link]]` relation predicates"
    }

    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
        let predicates = self.collect(corpus);
        let mut issues = Vec::new();

        for (name, usage) in &predicates {
            if usage.count >= self.usage_threshold {
                continue;
            }
            for location in &usage.locations {
                let count = usage.count;
                let preview = self.language.pick(
                    format!("Predicate \"{name}\" has low usage ({count} times): {}", location.preview),
                    format!("谓语 \"{name}\" 使用频率过低 ({count} 次): {}", location.preview),
                );
                let id = issue_id(&[self.id(), name.as_str(), &location.doc.path, &location.span.start.to_string()]);
                issues.push(corpus.issue(self.id(), &location.doc, id, preview, location.span, Severity::Low));
            }
        }

        // Each unordered pair once, attached to the first location of the earlier predicate
        let names: Vec<&String> = predicates.keys().collect();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                if !is_similar(first.as_str(), second.as_str()) {
                    continue;
                }
                let Some(location) = predicates.get(*first).and_then(|u| u.locations.first()) else {
                    continue;
                };
                let preview = self.language.pick(
                    format!("Predicate \"{first}\" and \"{second}\" may have spelling similarity"),
                    format!("谓语 \"{first}\" 与 \"{second}\" 可能存在拼写相似性"),
                );
                let id = issue_id(&[self.id(), first.as_str(), second.as_str()]);
                issues.push(corpus.issue(self.id(), &location.doc, id, preview, location.span, Severity::Low));
            }
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::vault::MemoryVault;

    fn run(vault: &MemoryVault, threshold: usize) -> Vec<DiagnosticIssue> {
        let settings = Settings::default();
        PredicateConsistencyRule::new(threshold, Language::En)
            .check(&Corpus::build(vault, &settings))
            .unwrap()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("内容", "内容"), 0);
        assert_eq!(levenshtein("内容", "内存"), 1);
    }

    #[test]
    fn test_similarity() {
        assert!(is_similar("内容", "内容"));
        assert!(!is_similar("ab", "xy"));
        assert!(is_similar("", ""));
        assert!(is_similar("supports", "suports"));
        assert!(!is_similar("内容", "内存"));
    }

    #[test]
    fn test_default_threshold_flags_nothing_for_usage() {
        let vault = MemoryVault::new().note("a.md", "causes:: [[b]]\nowner:: [[c]]");
        assert!(run(&vault, 1).is_empty());
        assert!(run(&vault, 0).is_empty());
    }

    #[test]
    fn test_raised_threshold_flags_each_location() {
        let vault = MemoryVault::new()
            .note("a.md", "x causes:: [[b]]")
            .note("b.md", "causes:: [[c]]\nrare:: [[d]]");
        let issues = run(&vault, 2);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.id, "predicate-consistency-rare-b.md-15");
        assert_eq!(issue.position, Span::new(15, 21));
        assert!(issue.context_preview.starts_with("Predicate \"rare\" has low usage (1 times): "));
    }

    #[test]
    fn test_similar_pair_reported_once() {
        let vault = MemoryVault::new()
            .note("a.md", "supports:: [[x]]")
            .note("b.md", "suports:: [[y]]");
        let issues = run(&vault, 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "predicate-consistency-supports-suports");
        assert_eq!(issues[0].file_path, "a.md");
        assert_eq!(issues[0].position, Span::new(0, 10));
    }

    #[test]
    fn test_cjk_predicates_use_char_offsets() {
        let vault = MemoryVault::new().note("a.md", "概念 包含:: [[b]]");
        let issues = run(&vault, 2);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, Span::new(3, 7));
        assert!(issues[0].context_preview.ends_with("概念 包含:: [[b]]"));
    }

    #[test]
    fn test_non_ascii_letters_do_not_form_predicates() {
        let vault = MemoryVault::new().note("a.md", "café:: [[b]]\nключ:: [[c]]\nkey:: [[d]]");
        let issues = run(&vault, 2);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "predicate-consistency-key-a.md-26");
    }
}
