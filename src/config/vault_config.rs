//! Vault-level configuration file
//!
//! An optional `notehealth.toml` at the vault root overrides the stored
//! settings on every load. Only the fields present in the file are applied.
//!
//! ```toml
//! language = "en"
//!
//! [rules]
//! required_fields = ["type", "status", "domain"]
//! max_note_length = 1500
//! min_context_length = 50
//! predicate_usage_threshold = 1
//! atom_types = ["atom", "concept", "entity"]
//!
//! [exclude]
//! folders = ["templates", "daily"]
//! tags = ["draft"]
//!
//! [weights]
//! metadata-integrity = 5.0
//! naked-links = 2.0
//! ```

use super::settings::{Language, Settings};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const VAULT_CONFIG_FILE: &str = "notehealth.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub exclude: ExcludeConfig,
    /// Rule ID -> penalty per issue
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RulesConfig {
    pub required_fields: Option<Vec<String>>,
    pub max_note_length: Option<usize>,
    pub min_context_length: Option<usize>,
    pub predicate_usage_threshold: Option<usize>,
    pub atom_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExcludeConfig {
    pub folders: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExportConfig {
    pub template: Option<String>,
}

impl VaultConfig {
    /// Overlay the fields present in this file onto `settings`
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(language) = self.language {
            settings.language = language;
        }

        let rules = &self.rules;
        if let Some(fields) = &rules.required_fields {
            settings.required_metadata_fields = fields.clone();
        }
        if let Some(max) = rules.max_note_length {
            settings.max_note_length = max;
        }
        if let Some(min) = rules.min_context_length {
            settings.min_context_length = min;
        }
        if let Some(threshold) = rules.predicate_usage_threshold {
            settings.predicate_usage_threshold = threshold;
        }
        if let Some(types) = &rules.atom_types {
            settings.knowledge_atom_types = types.clone();
        }

        if let Some(folders) = &self.exclude.folders {
            settings.excluded_folders = folders.clone();
        }
        if let Some(tags) = &self.exclude.tags {
            settings.excluded_tags = tags.clone();
        }

        for (rule_id, weight) in &self.weights {
            if weight.is_finite() {
                settings.rule_weights.insert(rule_id.clone(), *weight);
            } else {
                warn!("Ignoring non-finite weight for {}", rule_id);
            }
        }

        if let Some(template) = &self.export.template {
            settings.export_template = template.clone();
        }
    }
}

/// Load `notehealth.toml` from the vault root; defaults when absent or invalid
pub fn load_vault_config(vault_root: &Path) -> VaultConfig {
    let path = vault_root.join(VAULT_CONFIG_FILE);
    if !path.exists() {
        debug!("No vault config found, using stored settings");
        return VaultConfig::default();
    }
    match load_toml_config(&path) {
        Ok(config) => {
            debug!("Loaded vault config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            VaultConfig::default()
        }
    }
}

fn load_toml_config(path: &Path) -> Result<VaultConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: VaultConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Write an example `notehealth.toml` unless one exists. Returns its path.
pub fn init_vault_config(vault_root: &Path) -> Result<PathBuf> {
    let path = vault_root.join(VAULT_CONFIG_FILE);
    if !path.exists() {
        let example = r#"# notehealth vault configuration
# Values here override the stored settings on every run.

# language = "en"   # or "zh"

[rules]
# required_fields = ["type", "status", "domain"]
# max_note_length = 1500
# min_context_length = 50
# predicate_usage_threshold = 1
# atom_types = ["atom", "concept", "entity"]

[exclude]
# folders = ["templates"]
# tags = ["draft"]

[weights]
# metadata-integrity = 5.0
# naked-links = 2.0
# graph-connectivity = 1.0
# note-atomicity = 0.8
# predicate-consistency = 0.5
"#;
        std::fs::write(&path, example)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_overlay_only_touches_present_fields() {
        let config: VaultConfig = toml::from_str(
            r#"
language = "zh"

[rules]
max_note_length = 800

[exclude]
folders = ["templates"]

[weights]
naked-links = 4.0
"#,
        )
        .unwrap();

        let mut settings = Settings::default();
        config.apply(&mut settings);
        assert_eq!(settings.language, Language::Zh);
        assert_eq!(settings.max_note_length, 800);
        assert_eq!(settings.min_context_length, 50);
        assert_eq!(settings.excluded_folders, vec!["templates"]);
        assert_eq!(settings.weight("naked-links"), 4.0);
        assert_eq!(settings.weight("metadata-integrity"), 5.0);
    }

    #[test]
    fn test_missing_and_invalid_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_vault_config(dir.path()), VaultConfig::default());

        std::fs::write(dir.path().join(VAULT_CONFIG_FILE), "this is [[ not toml").unwrap();
        assert_eq!(load_vault_config(dir.path()), VaultConfig::default());
    }

    #[test]
    fn test_init_writes_parsable_example() {
        let dir = TempDir::new().unwrap();
        let path = init_vault_config(dir.path()).unwrap();
        assert!(path.exists());
        let config = load_vault_config(dir.path());
        assert_eq!(config, VaultConfig::default());

        std::fs::write(&path, "[rules]\nmax_note_length = 10\n").unwrap();
        init_vault_config(dir.path()).unwrap();
        assert_eq!(load_vault_config(dir.path()).rules.max_note_length, Some(10));
    }
}
