use crate::algorithms::affine::SolverConfig;
use crate::processing::preprocess::PreprocessingConfig;
use crate::processing::quality::QualityThresholds;
use crate::validation::correspondence::{CollinearityTolerance, ValidationConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Complete engine configuration, persisted as JSON
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Correspondence validation
    pub validation: ValidationConfig,
    /// Affine and Procrustes solver tolerances
    pub solver: SolverConfig,
    /// Signal quality thresholds
    pub quality: QualityThresholds,
    /// Observation preprocessing
    pub preprocessing: PreprocessingConfig,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.ensure_valid()?;
        let content = self.to_json_string()?;
        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// Every invalid parameter found, empty when the configuration is usable
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let v = &self.validation;
        if v.min_points < 3 {
            errors.push(ConfigError::invalid("validation.min_points", v.min_points, "must be at least 3"));
        }
        if !(v.coincidence_tolerance >= 0.0) {
            errors.push(ConfigError::invalid(
                "validation.coincidence_tolerance",
                v.coincidence_tolerance,
                "must be non-negative",
            ));
        }
        let collinearity = match v.collinearity_tolerance {
            CollinearityTolerance::Absolute(t) | CollinearityTolerance::RelativeToExtent(t) => t,
        };
        if !(collinearity >= 0.0) {
            errors.push(ConfigError::invalid(
                "validation.collinearity_tolerance",
                collinearity,
                "must be non-negative",
            ));
        }

        let s = &self.solver;
        for (name, value) in [
            ("solver.pivot_tolerance", s.pivot_tolerance),
            ("solver.determinant_tolerance", s.determinant_tolerance),
            ("solver.variance_tolerance", s.variance_tolerance),
        ] {
            if !(value > 0.0) {
                errors.push(ConfigError::invalid(name, value, "must be positive"));
            }
        }

        let q = &self.quality;
        for (name, value) in [
            ("quality.min_strength", q.min_strength),
            ("quality.min_confidence", q.min_confidence),
            ("quality.min_line_of_sight_ratio", q.min_line_of_sight_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::invalid(name, value, "must be within [0, 1]"));
            }
        }
        if !(q.max_error_estimate_m >= 0.0) {
            errors.push(ConfigError::invalid(
                "quality.max_error_estimate_m",
                q.max_error_estimate_m,
                "must be non-negative",
            ));
        }

        if self.preprocessing.moving_average_window_size == 0 {
            errors.push(ConfigError::invalid(
                "preprocessing.moving_average_window_size",
                0,
                "must be at least 1",
            ));
        }

        errors
    }

    fn ensure_valid(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
