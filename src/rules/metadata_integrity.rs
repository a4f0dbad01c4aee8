//! Metadata integrity rule
//!
//! Every note needs a front-matter block carrying the configured required
//! fields. A missing block is `high`; missing fields are `medium` and are
//! listed in the order the settings name them.

use super::base::Rule;
use super::corpus::Corpus;
use crate::config::{Language, METADATA_INTEGRITY};
use crate::models::{issue_id, DiagnosticIssue, Severity, Span};
use anyhow::Result;

pub struct MetadataIntegrityRule {
    required_fields: Vec<String>,
    language: Language,
}

impl MetadataIntegrityRule {
    pub fn new(required_fields: Vec<String>, language: Language) -> Self {
        Self {
            required_fields,
            language,
        }
    }
}

impl Rule for MetadataIntegrityRule {
    fn id(&self) -> &'static str {
        METADATA_INTEGRITY
    }

    fn name(&self) -> &'static str {
        "Metadata integrity"
    }

    fn description(&self) -> &'static str {
        "Checks that notes carry YAML front matter with the required fields"
    }

    fn check(&self, corpus: &Corpus) -> Result<Vec<DiagnosticIssue>> {
        let mut issues = Vec::new();

        for entry in corpus.documents() {
            let id = issue_id(&[self.id(), &entry.doc.path]);
            let frontmatter = entry.metadata.as_ref().and_then(|m| m.frontmatter.as_ref());

            let Some(frontmatter) = frontmatter else {
                let preview = self.language.pick(
                    "Missing YAML Frontmatter".to_string(),
                    "缺少YAML Frontmatter".to_string(),
                );
                issues.push(corpus.issue(self.id(), &entry.doc, id, preview, Span::DOCUMENT, Severity::High));
                continue;
            };

            let missing: Vec<&str> = self
                .required_fields
                .iter()
                .filter(|field| !frontmatter.contains_key(field.as_str()))
                .map(String::as_str)
                .collect();

            if !missing.is_empty() {
                let list = missing.join(", ");
                let preview = self.language.pick(
                    format!("Missing required fields: {list}"),
                    format!("缺少必填字段: {list}"),
                );
                issues.push(corpus.issue(self.id(), &entry.doc, id, preview, Span::DOCUMENT, Severity::Medium));
            }
        }

        Ok(issues)
    }
}
