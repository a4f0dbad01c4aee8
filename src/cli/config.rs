//! Config and rules commands

use super::open_session;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::path::Path;

pub fn show(vault: &Path) -> Result<()> {
    let session = open_session(vault, None, None)?;
    // The snapshot is large and shown by `report`
    let settings = Settings {
        saved_diagnosis: None,
        ..session.settings()
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn set(vault: &Path, key: &str, value: &str) -> Result<()> {
    let session = open_session(vault, None, None)?;
    session.update_settings(|s| s.set_value(key, value))?;
    println!("{} {} = {}", style("✓").green(), style(key).cyan(), value);
    Ok(())
}

pub fn rules(vault: &Path) -> Result<()> {
    let session = open_session(vault, None, None)?;
    let settings = session.settings();
    let registry = session.engine().registry();

    for rule in registry.instantiate(&settings) {
        println!(
            "{:<24} {:<8} {}",
            style(rule.id()).cyan(),
            format!("w={}", settings.weight(rule.id())),
            rule.description()
        );
    }
    Ok(())
}
