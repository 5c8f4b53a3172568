//! Serializable engine and force configuration.

use serde::{Deserialize, Serialize};

use crate::forces::{DragScope, Force, GravityMode};
use crate::{LayoutError, Result};

/// Engine configuration.
///
/// All fields have defaults, so a partial JSON document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// A run is stable once the movement metric changes by less than this
    /// between two consecutive steps.
    pub stable_threshold: f64,
    /// Step budget for stable-seeking runs.
    pub max_steps: u64,
    /// Optional wall-clock budget for stable-seeking runs, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<f64>,
    /// Radial spacing of the seed spiral.
    pub seed_spacing: f64,
    /// Forces registered by [`LayoutEngine::from_config`].
    ///
    /// [`LayoutEngine::from_config`]: crate::LayoutEngine::from_config
    pub forces: Vec<ForceConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            stable_threshold: 2.001,
            max_steps: 100_000,
            max_duration_secs: None,
            seed_spacing: 10.0,
            forces: Vec::new(),
        }
    }
}

impl LayoutConfig {
    /// Default engine settings with a general-purpose force set: Barnes-Hut
    /// repulsion, springs along links, and full drag.
    pub fn with_default_forces() -> Self {
        Self {
            forces: vec![
                ForceConfig::Gravity {
                    coefficient: -1.0,
                    mode: GravityModeConfig::BarnesHut,
                    theta: default_theta(),
                },
                ForceConfig::Spring {
                    coefficient: 0.05,
                    rest_length: 10.0,
                },
                ForceConfig::Drag {
                    coefficient: 1.0,
                    scope: DragScope::EachBody,
                },
            ],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stable_threshold.is_finite() || self.stable_threshold < 0.0 {
            return Err(LayoutError::config(format!(
                "stable_threshold must be a non-negative number, got {}",
                self.stable_threshold
            )));
        }
        if self.max_steps == 0 {
            return Err(LayoutError::config("max_steps must be at least 1"));
        }
        if let Some(secs) = self.max_duration_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(LayoutError::config(format!(
                    "max_duration_secs must be positive, got {secs}"
                )));
            }
        }
        if !self.seed_spacing.is_finite() || self.seed_spacing <= 0.0 {
            return Err(LayoutError::config(format!(
                "seed_spacing must be positive, got {}",
                self.seed_spacing
            )));
        }
        for force in &self.forces {
            force.build()?;
        }
        Ok(())
    }

    /// Builds every configured force, in order.
    pub fn build_forces(&self) -> Result<Vec<Force>> {
        self.forces.iter().map(ForceConfig::build).collect()
    }
}

fn default_theta() -> f64 {
    0.5
}

/// Gravity evaluation strategy as written in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GravityModeConfig {
    Exact,
    #[default]
    BarnesHut,
}

/// One force entry of a configuration file.
///
/// ```
/// use vibe_graph_layout::ForceConfig;
///
/// let json = r#"[
///     {"type": "gravity", "coefficient": -1.0, "mode": "barnes-hut", "theta": 0.7},
///     {"type": "drag", "coefficient": 0.5},
///     {"type": "spring", "coefficient": 0.1, "rest_length": 20.0}
/// ]"#;
/// let forces: Vec<ForceConfig> = serde_json::from_str(json).unwrap();
/// assert_eq!(forces.len(), 3);
/// assert!(forces.iter().all(|f| f.build().is_ok()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ForceConfig {
    Gravity {
        coefficient: f64,
        #[serde(default)]
        mode: GravityModeConfig,
        /// Only used in Barnes-Hut mode.
        #[serde(default = "default_theta")]
        theta: f64,
    },
    Drag {
        coefficient: f64,
        #[serde(default)]
        scope: DragScope,
    },
    Spring {
        coefficient: f64,
        #[serde(default)]
        rest_length: f64,
    },
}

impl ForceConfig {
    /// Validates the entry and turns it into a [`Force`].
    pub fn build(&self) -> Result<Force> {
        match *self {
            ForceConfig::Gravity {
                coefficient,
                mode,
                theta,
            } => {
                let mode = match mode {
                    GravityModeConfig::Exact => GravityMode::Exact,
                    GravityModeConfig::BarnesHut => GravityMode::BarnesHut { theta },
                };
                Force::gravity(coefficient, mode)
            }
            ForceConfig::Drag { coefficient, scope } => Force::drag_with_scope(coefficient, scope),
            ForceConfig::Spring {
                coefficient,
                rest_length,
            } => Force::spring(coefficient, rest_length),
        }
    }
}
