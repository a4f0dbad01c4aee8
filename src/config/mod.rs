//! Configuration module for notehealth
//!
//! This module handles:
//! - The settings blob read by every rule (`settings`)
//! - Persisting that blob (`store`)
//! - The user-editable `notehealth.toml` overlay (`vault_config`)

pub mod settings;
mod store;
mod vault_config;

pub use settings::{
    normalize_tag, Language, Settings, SettingsError, GRAPH_CONNECTIVITY, METADATA_INTEGRITY,
    NAKED_LINKS, NOTE_ATOMICITY, PREDICATE_CONSISTENCY,
};
pub use store::{JsonSettingsStore, MemorySettingsStore, SettingsStore, STATE_DIR};
pub use vault_config::{
    init_vault_config, load_vault_config, ExcludeConfig, ExportConfig, RulesConfig, VaultConfig,
    VAULT_CONFIG_FILE,
};
