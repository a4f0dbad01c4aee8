//! Markdown indexing: links, embeds and headings with character offsets
//!
//! Matches inside the front-matter block, fenced code and inline code are
//! skipped, the same regions a markdown renderer would not treat as links.

use super::frontmatter::extract_frontmatter;
use super::{Heading, Link, NoteMetadata, Position};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

static WIKI_LINK: OnceLock<Regex> = OnceLock::new();
static MARKDOWN_LINK: OnceLock<Regex> = OnceLock::new();
static FENCED_CODE: OnceLock<Regex> = OnceLock::new();
static INLINE_CODE: OnceLock<Regex> = OnceLock::new();
static HEADING: OnceLock<Regex> = OnceLock::new();

fn wiki_link() -> &'static Regex {
    WIKI_LINK.get_or_init(|| Regex::new(r"(!?)\[\[([^\[\]\n]+?)\]\]").expect("valid regex"))
}

fn markdown_link() -> &'static Regex {
    MARKDOWN_LINK
        .get_or_init(|| Regex::new(r"(!?)\[([^\[\]\n]*)\]\(([^()\n]*)\)").expect("valid regex"))
}

fn fenced_code() -> &'static Regex {
    FENCED_CODE.get_or_init(|| Regex::new(r"```[\s\S]*?(?:```|\z)").expect("valid regex"))
}

fn inline_code() -> &'static Regex {
    INLINE_CODE.get_or_init(|| Regex::new(r"`[^`\n]*`").expect("valid regex"))
}

fn heading() -> &'static Regex {
    HEADING.get_or_init(|| Regex::new(r"^(#{1,6})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex"))
}

/// Maps byte offsets to character offsets
pub struct CharIndex {
    boundaries: Vec<usize>,
}

impl CharIndex {
    pub fn new(content: &str) -> Self {
        Self {
            boundaries: content.char_indices().map(|(i, _)| i).collect(),
        }
    }

    /// Character offset of a byte offset (which must sit on a char boundary
    /// or at the end of the content)
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.boundaries.binary_search(&byte) {
            Ok(i) | Err(i) => i,
        }
    }
}

/// Byte ranges of fenced and inline code
pub fn code_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = fenced_code().find_iter(content).map(|m| m.range()).collect();
    let fenced = ranges.clone();
    for m in inline_code().find_iter(content) {
        if !fenced.iter().any(|r| r.contains(&m.start())) {
            ranges.push(m.range());
        }
    }
    ranges
}

fn strip_fragment(target: &str) -> &str {
    target.split('#').next().unwrap_or("").trim()
}

fn is_url(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:")
}

/// Build the metadata index for a note's raw content
pub fn index_note(content: &str) -> NoteMetadata {
    let (frontmatter, body_start) = match extract_frontmatter(content) {
        Some((fm, end)) => (Some(fm), end),
        None => (None, 0),
    };
    let code = code_ranges(content);
    let skipped = |byte: usize| byte < body_start || code.iter().any(|r| r.contains(&byte));
    let chars = CharIndex::new(content);
    let position = |range: Range<usize>| Position {
        start: chars.char_offset(range.start),
        end: chars.char_offset(range.end),
    };

    // (byte_start, is_embed, link)
    let mut found: Vec<(usize, bool, Link)> = Vec::new();

    for caps in wiki_link().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if skipped(whole.start()) {
            continue;
        }
        let embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let (target, display) = match inner.split_once('|') {
            Some((t, alias)) => (t, Some(alias.trim().to_string())),
            None => (inner, None),
        };
        found.push((
            whole.start(),
            embed,
            Link {
                target: strip_fragment(target).to_string(),
                display,
                original: whole.as_str().to_string(),
                position: position(whole.range()),
            },
        ));
    }

    for caps in markdown_link().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if skipped(whole.start()) {
            continue;
        }
        let embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let label = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let raw = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
        let raw = match raw.strip_prefix('<') {
            Some(rest) => rest.split('>').next().unwrap_or(""),
            None => raw.split_whitespace().next().unwrap_or(""),
        };
        if raw.is_empty() || raw.starts_with('#') || is_url(raw) {
            continue;
        }
        found.push((
            whole.start(),
            embed,
            Link {
                target: strip_fragment(&raw.replace("%20", " ")).to_string(),
                display: (!label.is_empty()).then(|| label.to_string()),
                original: whole.as_str().to_string(),
                position: position(whole.range()),
            },
        ));
    }

    found.sort_by_key(|(start, _, _)| *start);
    let mut links = Vec::new();
    let mut embeds = Vec::new();
    for (_, embed, link) in found {
        if embed {
            embeds.push(link);
        } else {
            links.push(link);
        }
    }

    NoteMetadata {
        frontmatter,
        links,
        embeds,
        headings: index_headings(&content[body_start..], content[..body_start].lines().count()),
    }
}

fn index_headings(body: &str, first_line: usize) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    for (i, line) in body.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = heading().captures(line) {
            let level = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1);
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            headings.push(Heading {
                level,
                text: text.to_string(),
                line: first_line + i,
            });
        }
    }
    headings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiki_links_with_alias_and_fragment() {
        let meta = index_note("See [[notes/rust#Ownership|ownership]] and [[plain]].");
        assert_eq!(meta.links.len(), 2);
        assert_eq!(meta.links[0].target, "notes/rust");
        assert_eq!(meta.links[0].display.as_deref(), Some("ownership"));
        assert_eq!(meta.links[1].target, "plain");
        assert_eq!(meta.links[1].display, None);
    }

    #[test]
    fn test_positions_are_char_offsets() {
        let content = "概念：[[目标]]";
        let meta = index_note(content);
        let link = &meta.links[0];
        assert_eq!(link.position.start, 3);
        assert_eq!(link.position.end, 9);
        let covered: String = content
            .chars()
            .skip(link.position.start)
            .take(link.position.end - link.position.start)
            .collect();
        assert_eq!(covered, "[[目标]]");
    }

    #[test]
    fn test_markdown_links_and_embeds() {
        let meta = index_note("[label](other.md) [site](https://x.io) ![[pic.png]] ![img](a%20b.png)");
        assert_eq!(meta.links.len(), 1);
        assert_eq!(meta.links[0].target, "other.md");
        assert_eq!(meta.links[0].display.as_deref(), Some("label"));
        assert_eq!(meta.embeds.len(), 2);
        assert_eq!(meta.embeds[1].target, "a b.png");
    }

    #[test]
    fn test_code_and_frontmatter_are_skipped() {
        let content = "---\nrel: \"[[in-yaml]]\"\n---\n`[[inline]]`\n```\n[[fenced]]\n# not a heading\n```\n# Real\n[[kept]]";
        let meta = index_note(content);
        assert!(meta.frontmatter.is_some());
        assert_eq!(meta.links.len(), 1);
        assert_eq!(meta.links[0].target, "kept");
        assert_eq!(meta.headings.len(), 1);
        assert_eq!(meta.headings[0].text, "Real");
        assert_eq!(meta.headings[0].level, 1);
    }

    #[test]
    fn test_heading_levels() {
        let meta = index_note("# One\n## Two ##\n####### seven\n#nospace");
        let levels: Vec<usize> = meta.headings.iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![1, 2]);
        assert_eq!(meta.headings[1].text, "Two");
    }
}
