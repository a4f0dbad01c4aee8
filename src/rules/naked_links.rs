//! Naked link rule
//!
//! An internal link should sit in a sentence that says how the two notes
//! relate. A link is flagged when the text around it carries none of the
//! relational keywords below and the link is not written with an explicit
//! label (`[[target|label]]` or `[label](target)`).

use super::base::Rule;
use super::corpus::Corpus;
use crate::config::NAKED_LINKS;
use crate::models::{issue_id, DiagnosticIssue, Severity, Span};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Characters inspected on each side of a link for label syntax
const FORMAT_PADDING: usize = 10;

/// Relational verbs and connectors, Chinese then English
const CONTEXT_KEYWORDS: &[&str] = &[
    "总结", "说明", "参考", "详见", "见", "关于", "介绍", "讨论", "分析", "描述", "解释", "定义",
    "提供", "展示", "记录", "表示", "指出", "强调", "认为", "觉得", "发现", "::", "关联", "连接",
    "影响", "导致", "促进", "抑制", "包含", "组成", "构成", "体现", "代表", "象征", "反映", "支持",
    "反对", "依赖", "源于", "归因于", "属于", "作用于", "适用于", "应用于", "产生", "形成", "达成",
    "实现", "发展", "演变", "转化", "转变", "引发", "基于", "遵循", "符合", "符合于", "来源于",
    "揭示", "证明", "阐述", "涉及", "涵盖", "包括", "意味着", "预示", "对比", "承载", "运用",
    "构建", "分类于", "区别于", "平行于", "解决", "处理", "整合", "优化", "简化",
    "relate", "connect", "affect", "cause", "promote", "inhibit", "contain", "compose",
    "constitute", "embody", "represent", "symbolize", "reflect", "support", "oppose", "depend",
    "derive", "attribute", "belong", "act", "apply", "produce", "form", "develop", "evolve",
    "transform", "trigger", "base", "follow", "comply", "source", "reveal", "prove", "explain",
    "involve", "cover", "include", "mean", "predict", "contrast", "carry", "use", "build",
    "classify", "distinguish", "parallel", "solve", "handle", "integrate", "optimize", "simplify",
];

static KEYWORDS: OnceLock<Regex> = OnceLock::new();
static ALIASED_WIKI_LINK: OnceLock<Regex> = OnceLock::new();
static LABELLED_MARKDOWN_LINK: OnceLock<Regex> = OnceLock::new();

fn keywords() -> &'static Regex {
    KEYWORDS.get_or_init(|| {
        let alternation: Vec<String> = CONTEXT_KEYWORDS.iter().map(|k| regex::escape(k)).collect();
        Regex::new(&format!("(?:{})", alternation.join("|"))).expect("valid regex")
    })
}

fn aliased_wiki_link() -> &'static Regex {
    ALIASED_WIKI_LINK.get_or_init(|| Regex::new(r"\[\[[^\]]+\|[^\]]+\]\]").expect("valid regex"))
}

fn labelled_markdown_link() -> &'static Regex {
    LABELLED_MARKDOWN_LINK.get_or_init(|| Regex::new(r"\[[^\]]+\]\([^)]+\)").expect("valid regex"))
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    chars[start.min(chars.len())..end.min(chars.len())].iter().collect()
}

pub fn has_context_keyword(text: &str) -> bool {
    keywords().is_match(text)
}

pub fn is_labelled(text: &str) -> bool {
    aliased_wiki_link().is_match(text) || labelled_markdown_link().is_match(text)
}

pub struct NakedLinksRule {
    min_context_length: usize,
}

impl NakedLinksRule {
    pub fn new(min_context_length: usize) -> Self {
        Self { min_context_length }
    }
}

impl Rule for NakedLinksRule {
    fn id(&self) -> &'static str {
        NAKED_LINKS
    }

    fn name(&self) -> &'static str {
        "Naked links"
    }

    fn description(&self) -> &'static str {
        "Checks that internal links are surrounded by explanatory context"
    }

    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
        let mut issues = Vec::new();

        for entry in corpus.documents() {
            let Some(metadata) = entry.metadata.as_ref() else {
                continue;
            };
            if metadata.links.is_empty() {
                continue;
            }
            let Some(content) = corpus.read(entry) else {
                continue;
            };
            let chars: Vec<char> = content.chars().collect();

            for link in metadata.links.iter().filter(|l| l.is_internal()) {
                let start = link.position.start.min(chars.len());
                let end = link.position.end.clamp(start, chars.len());

                let window_start = start.saturating_sub(self.min_context_length);
                let window_end = (end + self.min_context_length).min(chars.len());

                let mut surrounding = slice(&chars, window_start, start);
                surrounding.push_str(&slice(&chars, end, window_end));
                if has_context_keyword(&surrounding) {
                    continue;
                }

                let padded = slice(&chars, start.saturating_sub(FORMAT_PADDING), end + FORMAT_PADDING);
                if is_labelled(&padded) {
                    continue;
                }

                let id = issue_id(&[self.id(), &entry.doc.path, &start.to_string()]);
                issues.push(corpus.issue(
                    self.id(),
                    &entry.doc,
                    id,
                    slice(&chars, window_start, window_end),
                    Span::new(start, end),
                    Severity::Low,
                ));
            }
        }

        Ok(issues)
    }
}
