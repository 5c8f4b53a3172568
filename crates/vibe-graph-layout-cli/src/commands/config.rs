//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Print the effective configuration as JSON.
pub fn show(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Write the default configuration to the config file.
pub fn reset() -> Result<()> {
    let path = Config::default().save()?;
    println!("Configuration reset: {}", path.display());
    Ok(())
}
