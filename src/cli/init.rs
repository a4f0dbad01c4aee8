//! Init command - prepare a vault for diagnosis

use crate::config::{init_vault_config, STATE_DIR};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(vault: &Path) -> Result<()> {
    let root = vault
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", vault.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    println!("\n{} Initializing notehealth\n", style("•").bold());

    let state_dir = root.join(STATE_DIR);
    if state_dir.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(state_dir.display()).cyan()
        );
    } else {
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;
        println!("{} Created {}", style("✓").green(), style(state_dir.display()).cyan());
    }

    let config_path = init_vault_config(&root)?;
    println!("{} Config at {}", style("✓").green(), style(config_path.display()).cyan());
    println!(
        "\nNext: {}",
        style(format!("notehealth --vault {} diagnose", vault.display())).bold()
    );
    Ok(())
}
