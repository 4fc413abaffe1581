//! `graphium config`: inspect the effective merged configuration and
//! scaffold a `.graphium/config.yaml` for a fresh checkout.

use anyhow::{bail, Context, Result};

use crate::infrastructure::config::{ConfigLoader, GraphiumConfig};

pub async fn handle_show(json: bool) -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}

pub async fn handle_init(force: bool) -> Result<()> {
    let dir = std::path::Path::new(".graphium");
    let path = dir.join("config.yaml");
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let default_config = GraphiumConfig::default();
    let yaml = serde_yaml::to_string(&default_config)?;
    std::fs::write(&path, yaml).with_context(|| format!("failed to write {}", path.display()))?;

    println!("wrote default configuration to {}", path.display());
    Ok(())
}
