//! CLI configuration management.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file (an
//! explicit `--config` path or the per-user config directory), `VGL_*`
//! environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use vibe_graph_layout::LayoutConfig;

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine settings and the force set.
    pub layout: LayoutConfig,

    /// Pretty-print the output document.
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::with_default_forces(),
            pretty: true,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_file_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config
            .layout
            .validate()
            .context("Invalid layout configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Applies `VGL_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("VGL_STABLE_THRESHOLD") {
            self.layout.stable_threshold = parse_var("VGL_STABLE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("VGL_MAX_STEPS") {
            self.layout.max_steps = parse_var("VGL_MAX_STEPS", &value)?;
        }
        if let Some(value) = lookup("VGL_MAX_DURATION_SECS") {
            self.layout.max_duration_secs = Some(parse_var("VGL_MAX_DURATION_SECS", &value)?);
        }
        if let Some(value) = lookup("VGL_SEED_SPACING") {
            self.layout.seed_spacing = parse_var("VGL_SEED_SPACING", &value)?;
        }
        if let Some(value) = lookup("VGL_PRETTY") {
            self.pretty = parse_var("VGL_PRETTY", &value)?;
        }
        Ok(())
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::config_file_path().context("No config directory available on this system")?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        Ok(config_path)
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "vibe-graph", "vgl")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {value:?}"))
}
