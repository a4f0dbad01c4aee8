//! Note atomicity rule
//!
//! Flags notes that run past the length threshold, carry more than one
//! top-level heading, or split into many second-level sections. Headings are
//! counted after code and the front-matter block are stripped.

use super::base::Rule;
use super::corpus::Corpus;
use crate::config::{Language, NOTE_ATOMICITY};
use crate::models::{issue_id, DiagnosticIssue, Severity, Span};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Second-level heading count from which a split is suggested
const H2_SPLIT_THRESHOLD: usize = 5;

static FENCED_BLOCK: OnceLock<Regex> = OnceLock::new();
static UNTERMINATED_FENCE: OnceLock<Regex> = OnceLock::new();
static INLINE_CODE: OnceLock<Regex> = OnceLock::new();
static FRONTMATTER_BLOCK: OnceLock<Regex> = OnceLock::new();
static H1: OnceLock<Regex> = OnceLock::new();
static H2: OnceLock<Regex> = OnceLock::new();

fn fenced_block() -> &'static Regex {
    FENCED_BLOCK.get_or_init(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"))
}

fn unterminated_fence() -> &'static Regex {
    UNTERMINATED_FENCE.get_or_init(|| Regex::new(r"```[\s\S]*\z").expect("valid regex"))
}

fn inline_code() -> &'static Regex {
    INLINE_CODE.get_or_init(|| Regex::new(r"`[^`]*`").expect("valid regex"))
}

fn frontmatter_block() -> &'static Regex {
    FRONTMATTER_BLOCK.get_or_init(|| Regex::new(r"\A\u{feff}?---[\s\S]*?---").expect("valid regex"))
}

fn h1() -> &'static Regex {
    H1.get_or_init(|| Regex::new(r"(?m)^#\s").expect("valid regex"))
}

fn h2() -> &'static Regex {
    H2.get_or_init(|| Regex::new(r"(?m)^##\s").expect("valid regex"))
}

/// Content with code and the leading front matter removed
pub fn strip_for_heading_count(content: &str) -> String {
    let stripped = fenced_block().replace_all(content, "");
    let stripped = unterminated_fence().replace_all(&stripped, "");
    let stripped = inline_code().replace_all(&stripped, "");
    frontmatter_block().replace(&stripped, "").into_owned()
}

/// `(h1, h2)` counts over the stripped content
pub fn heading_counts(content: &str) -> (usize, usize) {
    let stripped = strip_for_heading_count(content);
    (h1().find_iter(&stripped).count(), h2().find_iter(&stripped).count())
}

pub struct NoteAtomicityRule {
    max_note_length: usize,
    language: Language,
}

impl NoteAtomicityRule {
    pub fn new(max_note_length: usize, language: Language) -> Self {
        Self {
            max_note_length,
            language,
        }
    }
}

impl Rule for NoteAtomicityRule {
    fn id(&self) -> &'static str {
        NOTE_ATOMICITY
    }

    fn name(&self) -> &'static str {
        "Note atomicity"
    }

    fn description(&self) -> &'static str {
        "Checks whether notes are too long or cover several topics"
    }

    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
        let mut issues = Vec::new();

        for entry in corpus.documents() {
            let Some(content) = corpus.read(entry) else {
                continue;
            };
            let path = entry.doc.path.as_str();

            let length = content.chars().count();
            if length > self.max_note_length {
                let max = self.max_note_length;
                let preview = self.language.pick(
                    format!("Note length ({length}) exceeds threshold ({max})"),
                    format!("笔记长度 ({length}) 超过阈值 ({max})"),
                );
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    issue_id(&[self.id(), path]),
                    preview,
                    Span::DOCUMENT,
                    Severity::Medium,
                ));
            }

            let (h1_count, h2_count) = heading_counts(&content);
            if h1_count > 1 {
                let preview = self.language.pick(
                    format!("Found {h1_count} H1 headers and {h2_count} H2 headers"),
                    format!("发现 {h1_count} 个H1标题，{h2_count} 个H2标题"),
                );
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    issue_id(&[self.id(), path, "h1"]),
                    preview,
                    Span::DOCUMENT,
                    Severity::Medium,
                ));
            } else if h2_count >= H2_SPLIT_THRESHOLD {
                let preview = self.language.pick(
                    format!("Found {h2_count} H2 headers, consider splitting the note"),
                    format!("发现 {h2_count} 个H2标题，建议考虑拆分笔记"),
                );
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    issue_id(&[self.id(), path, "h2"]),
                    preview,
                    Span::DOCUMENT,
                    Severity::Low,
                ));
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

    fn run(vault: &MemoryVault, max: usize) -> Vec<DiagnosticIssue> {
        let settings = Settings::default();
        NoteAtomicityRule::new(max, Language::En)
            .check(&Corpus::build(vault, &settings))
            .unwrap()
    }

    #[test]
    fn test_long_note_with_two_h1() {
        let mut body = String::from("# First\n## a\n## b\n## c\n## d\n## e\n# Second\n");
        while body.chars().count() < 2000 {
            body.push('x');
        }
        let vault = MemoryVault::new().note("long.md", &body);
        let issues = run(&vault, 1500);

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].id, "note-atomicity-long.md");
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].context_preview, "Note length (2000) exceeds threshold (1500)");
        assert_eq!(issues[1].id, "note-atomicity-long.md-h1");
        assert_eq!(issues[1].severity, Severity::Medium);
        assert_eq!(issues[1].context_preview, "Found 2 H1 headers and 5 H2 headers");
    }

    #[test]
    fn test_many_h2_suggests_split() {
        let vault = MemoryVault::new().note("n.md", "# T\n## 1\n## 2\n## 3\n## 4\n## 5\n");
        let issues = run(&vault, 1500);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "note-atomicity-n.md-h2");
        assert_eq!(issues[0].severity, Severity::Low);
    }

    #[test]
    fn test_headings_in_code_and_frontmatter_ignored() {
        let content = "---\ntitle: x\n---\n# Real\n```\n# fake\n```\n`# inline`\n```\n# unterminated";
        assert_eq!(heading_counts(content), (1, 0));
        let vault = MemoryVault::new().note("n.md", content);
        assert!(run(&vault, 1500).is_empty());
    }

    #[test]
    fn test_length_counts_characters() {
        let vault = MemoryVault::new().note("zh.md", "中文笔记");
        assert!(run(&vault, 4).is_empty());
        assert_eq!(run(&vault, 3).len(), 1);
    }
}
