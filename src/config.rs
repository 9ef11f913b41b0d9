//! View configuration.
//!
//! All options that change how a view is derived live here, so that the same
//! `(dictionary, selection, settings)` triple always yields the same view.
//! Settings can be read from a JSON file; missing keys take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in user supplied settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Hydropathicity window must be odd and at least 1 (got {0})")]
    InvalidWindow(usize),

    #[error("Hydropathicity edge weight must lie in [0, 1] (got {0})")]
    InvalidEdgeWeight(f64),

    #[error("Minimum variable position percentage must lie in [0, 100] (got {0})")]
    InvalidPercentage(f64),
}

/// How lower-case (ambiguous) calls enter variability and variable-position counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityMode {
    /// Ambiguous calls are displayed but not counted
    #[default]
    Mask,
    /// Ambiguous calls are counted like confident ones
    Show,
}

/// Predicates selecting the proteoforms of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Drop proteoforms annotated with a premature termination
    pub exclude_premature_termination: bool,
    /// Drop proteoforms observed in fewer samples
    pub min_sample_count: usize,
    /// Drop proteoforms with a lower percentage of variable positions
    pub min_variable_position_percent: f64,
    /// Proteoforms always shown; overrides the predicates above when non-empty
    pub proteoform_ids: Vec<String>,
    /// Proteoforms carrying any of these samples are always shown
    pub sample_ids: Vec<String>,
}

impl FilterSettings {
    /// True when an explicit allow-list replaces the numeric predicates.
    pub fn has_allow_list(&self) -> bool {
        !self.proteoform_ids.is_empty() || !self.sample_ids.is_empty()
    }
}

/// Settings of a derived view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Ignore a proteoform's calls after its first termination
    pub truncate_after_first_termination: bool,
    pub ambiguity_mode: AmbiguityMode,
    /// Odd sliding window size of the hydropathicity smoothing
    pub hydropathicity_window: usize,
    /// Relative weight of the outermost window positions
    pub hydropathicity_edge_weight: f64,
    pub filter: FilterSettings,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            truncate_after_first_termination: true,
            ambiguity_mode: AmbiguityMode::Mask,
            hydropathicity_window: 3,
            hydropathicity_edge_weight: 0.5,
            filter: FilterSettings::default(),
        }
    }
}

impl ViewSettings {
    /// Parses settings from JSON and validates them.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let settings: ViewSettings = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hydropathicity_window == 0 || self.hydropathicity_window % 2 == 0 {
            return Err(ConfigError::InvalidWindow(self.hydropathicity_window));
        }
        if !(0.0..=1.0).contains(&self.hydropathicity_edge_weight) {
            return Err(ConfigError::InvalidEdgeWeight(self.hydropathicity_edge_weight));
        }
        let percent = self.filter.min_variable_position_percent;
        if !(0.0..=100.0).contains(&percent) {
            return Err(ConfigError::InvalidPercentage(percent));
        }
        Ok(())
    }
}
