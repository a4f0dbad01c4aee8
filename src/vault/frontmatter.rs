//! YAML front-matter parsing and tag normalization

use crate::config::settings::normalize_tag;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Front-matter `tags` as written: a YAML list or a comma-delimited string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagField {
    List(Vec<String>),
    Delimited(String),
}

impl TagField {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(TagField::List(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            Value::Null => None,
            other => scalar_to_string(other).map(TagField::Delimited),
        }
    }

    /// Tags as written, trimmed, in order
    pub fn raw(&self) -> Vec<String> {
        match self {
            TagField::List(items) => items.iter().map(|t| t.trim().to_string()).collect(),
            TagField::Delimited(s) => s.split(',').map(|t| t.trim().to_string()).collect(),
        }
    }

    /// Canonical tag set: `#` stripped, lowercased, blanks dropped
    pub fn normalized(&self) -> BTreeSet<String> {
        self.raw()
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parsed YAML front matter of a note
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frontmatter {
    fields: BTreeMap<String, Value>,
}

impl Frontmatter {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A field rendered as a plain string (scalars only)
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(scalar_to_string)
    }

    pub fn tags(&self) -> Option<TagField> {
        self.fields.get("tags").and_then(TagField::from_value)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone().into_iter().collect())
    }
}

/// Extract the leading YAML block of a note.
///
/// Returns the parsed front matter and the byte offset where the body
/// starts. The opening `---` must be the first line; an unterminated or
/// non-mapping block counts as no front matter.
pub fn extract_frontmatter(content: &str) -> Option<(Frontmatter, usize)> {
    let body = content.strip_prefix('\u{feff}').unwrap_or(content);
    let bom = content.len() - body.len();

    let mut offset = 0;
    let mut lines = body.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    offset += first.len();

    let yaml_start = offset;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &body[yaml_start..offset];
            let end = bom + offset + line.len();
            return parse_yaml_map(yaml).map(|fields| (Frontmatter::new(fields), end));
        }
        offset += line.len();
    }
    None
}

fn parse_yaml_map(yaml: &str) -> Option<BTreeMap<String, Value>> {
    if yaml.trim().is_empty() {
        return Some(BTreeMap::new());
    }
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml).ok()?;
    let json_value: Value = serde_json::to_value(yaml_value).ok()?;

    match json_value {
        Value::Object(map) => Some(map.into_iter().collect()),
        Value::Null => Some(BTreeMap::new()),
        _ => None,
    }
}
