//! Decision tree configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::teachability::TeachabilityWeights;

/// Breadth and depth of the two search phases, plus ranking weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Candidates requested in the screening phase
    pub screen_breadth: usize,
    pub screen_depth: u8,
    /// Candidates kept for deep validation
    pub keep: usize,
    pub deep_depth: u8,
    pub weights: TeachabilityWeights,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            screen_breadth: 8,
            screen_depth: 10,
            keep: 3,
            deep_depth: 20,
            weights: TeachabilityWeights::default(),
        }
    }
}

impl TreeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects settings the builder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.screen_breadth == 0 || self.keep == 0 {
            return Err(Error::Config("breadth must be positive".into()));
        }
        if self.screen_depth == 0 || self.deep_depth == 0 {
            return Err(Error::Config("depth must be positive".into()));
        }
        if self.keep > self.screen_breadth {
            return Err(Error::Config(format!(
                "cannot keep {} of {} screened candidates",
                self.keep, self.screen_breadth
            )));
        }
        if self.deep_depth < self.screen_depth {
            return Err(Error::Config(format!(
                "deep depth {} is shallower than screen depth {}",
                self.deep_depth, self.screen_depth
            )));
        }
        let weights = &self.weights;
        if weights.concept_depth == 0 {
            return Err(Error::Config("concept depth must be positive".into()));
        }
        if weights.eval_loss_threshold_cp < 0 {
            return Err(Error::Config("evaluation loss threshold must not be negative".into()));
        }
        if weights.coefficients().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Config("weights must be finite and non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TreeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TreeConfig::from_json_str(r#"{"keep": 2, "weights": {"fork": 99.0}}"#).unwrap();
        assert_eq!(config.keep, 2);
        assert_eq!(config.screen_breadth, 8);
        assert_eq!(config.weights.fork, 99.0);
        assert_eq!(config.weights.pin, TeachabilityWeights::default().pin);
    }

    #[test]
    fn test_rejects_bad_settings() {
        for json in [
            r#"{"screen_breadth": 0}"#,
            r#"{"deep_depth": 0}"#,
            r#"{"keep": 9}"#,
            r#"{"screen_depth": 30}"#,
            r#"{"weights": {"concept_depth": 0}}"#,
            r#"{"weights": {"fork": -1.0}}"#,
        ] {
            assert!(
                matches!(TreeConfig::from_json_str(json), Err(Error::Config(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(TreeConfig::from_json_str("{keep: 2"), Err(Error::Json(_))));
    }
}
