//! # Monitor configuration — capacities, binning, and alert threshold
//!
//! All knobs live in one struct with production-tuned defaults, loadable
//! from a TOML file. A missing file is not an error: sidecar deployments
//! often run on defaults alone.

use crate::divergence::DEFAULT_EPSILON;
use crate::error::{DriftError, DriftResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Default capacity of each feature's reference window.
pub const DEFAULT_REFERENCE_CAPACITY: usize = 2000;
/// Default capacity of each feature's live window.
pub const DEFAULT_LIVE_CAPACITY: usize = 500;
/// Default histogram bin count, shared by both windows.
pub const DEFAULT_BIN_COUNT: usize = 20;
/// Default divergence score above which a feature is flagged as drifting.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples retained per reference window.
    pub reference_capacity: usize,
    /// Samples retained per live window.
    pub live_capacity: usize,
    /// Histogram bins used when scoring either window.
    pub bin_count: usize,
    /// Score above which an alert is emitted.
    pub threshold: f64,
    /// Additive smoothing constant for the divergence computation.
    pub epsilon: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reference_capacity: DEFAULT_REFERENCE_CAPACITY,
            live_capacity: DEFAULT_LIVE_CAPACITY,
            bin_count: DEFAULT_BIN_COUNT,
            threshold: DEFAULT_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl MonitorConfig {
    /// Reject configurations the monitor cannot operate under.
    pub fn validate(&self) -> DriftResult<()> {
        if self.reference_capacity == 0 {
            return Err(DriftError::Config("reference_capacity must be at least 1".into()));
        }
        if self.live_capacity == 0 {
            return Err(DriftError::Config("live_capacity must be at least 1".into()));
        }
        if self.bin_count == 0 {
            return Err(DriftError::Config("bin_count must be at least 1".into()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(DriftError::Config("threshold must be finite and non-negative".into()));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(DriftError::Config("epsilon must be finite and positive".into()));
        }
        Ok(())
    }

    /// Load config from a TOML file path. Missing fields fall back to
    /// defaults; a missing file yields the full default config.
    pub fn load(path: impl AsRef<Path>) -> DriftResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)
            .map_err(|e| DriftError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(
            path = %path.display(),
            reference_capacity = config.reference_capacity,
            live_capacity = config.live_capacity,
            bin_count = config.bin_count,
            threshold = config.threshold,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save current config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> DriftResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DriftError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.reference_capacity, 2000);
        assert_eq!(config.live_capacity, 500);
        assert_eq!(config.bin_count, 20);
        assert_eq!(config.threshold, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MonitorConfig::default();
        config.bin_count = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.epsilon = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: MonitorConfig = toml::from_str("threshold = 0.8\nbin_count = 10\n").unwrap();
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.bin_count, 10);
        assert_eq!(config.reference_capacity, 2000);
        assert_eq!(config.live_capacity, 500);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftwatch.toml");

        let mut config = MonitorConfig::default();
        config.threshold = 0.75;
        config.live_capacity = 128;
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded.threshold, 0.75);
        assert_eq!(loaded.live_capacity, 128);
        assert_eq!(loaded.bin_count, 20);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = MonitorConfig::load("/nonexistent/driftwatch.toml").unwrap();
        assert_eq!(config.reference_capacity, 2000);
    }
}
