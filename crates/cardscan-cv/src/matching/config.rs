//! Matcher configuration

use crate::config::ConfigError;
use cardscan_core::{FingerprintScheme, MatchPolicy};
use serde::{Deserialize, Serialize};

/// Fingerprint scheme plus the policy used to pick and grade a winner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub scheme: FingerprintScheme,
    pub policy: MatchPolicy,
}

impl MatcherConfig {
    /// Override the confidence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.policy.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheme.validate()?;

        let threshold = self.policy.threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::invalid("matcher.policy.threshold", threshold));
        }
        if self.policy.top_n == 0 {
            return Err(ConfigError::invalid("matcher.policy.top_n", 0));
        }
        Ok(())
    }
}
