use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::models::WeightConfig;
use crate::weights::normalize_weights;

const DEFAULT_CONFIG_FILE: &str = "canvaspal.toml";

/// Extra urgency granted when the remaining time falls inside a window.
/// Overlapping bands are not summed; the largest matching bonus wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusBand {
    pub within_hours: f64,
    pub bonus: f64,
}

/// Tunable constants of the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Items due further out than this many days get no urgency.
    pub far_future_days: f64,
    pub bonus_bands: Vec<BonusBand>,
    pub default_grade_weight_factor: f64,
    /// Blend absolute grade weight with the weight relative to the heaviest peer.
    pub peer_normalization: bool,
    pub default_impact_factor: f64,
    /// Damp impact for items where the current percentage is already at or above the cutoff.
    pub excellence_damping: bool,
    pub excellence_cutoff: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            far_future_days: 10.0,
            bonus_bands: vec![
                BonusBand {
                    within_hours: 24.0,
                    bonus: 0.3,
                },
                BonusBand {
                    within_hours: 72.0,
                    bonus: 0.2,
                },
                BonusBand {
                    within_hours: 168.0,
                    bonus: 0.1,
                },
            ],
            default_grade_weight_factor: 0.4,
            peer_normalization: true,
            default_impact_factor: 0.5,
            excellence_damping: true,
            excellence_cutoff: 90.0,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !self.far_future_days.is_finite() || self.far_future_days <= 0.0 {
            return Err(ScoringError::InvalidConfiguration(format!(
                "far_future_days must be positive, got {}",
                self.far_future_days
            )));
        }
        for band in &self.bonus_bands {
            if !band.within_hours.is_finite() || band.within_hours <= 0.0 || !band.bonus.is_finite()
            {
                return Err(ScoringError::InvalidConfiguration(format!(
                    "bonus band {band:?} needs a positive window and a finite bonus"
                )));
            }
        }
        for (name, value) in [
            ("default_grade_weight_factor", self.default_grade_weight_factor),
            ("default_impact_factor", self.default_impact_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoringError::InvalidConfiguration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if !self.excellence_cutoff.is_finite() {
            return Err(ScoringError::InvalidConfiguration(
                "excellence_cutoff must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: WeightConfig,
    pub tuning: Tuning,
}

impl ScoringConfig {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("invalid config in {}", config_path.display()))?;
        tracing::debug!(path = %config_path.display(), "loaded scoring config");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: ScoringConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        normalize_weights(&self.weights)?;
        self.tuning.validate()
    }
}
