//! Pipeline configuration and its JSON persistence.
//!
//! ```no_run
//! use cardscan_cv::PipelineConfig;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_json_file(Path::new("cardscan.json"))?;
//! # Ok::<(), cardscan_cv::ConfigError>(())
//! ```

use crate::detection::DetectorConfig;
use crate::matching::MatcherConfig;
use cardscan_core::HashError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration value {field} = {value}")]
    Invalid { field: String, value: String },

    #[error("invalid fingerprint scheme")]
    Scheme(#[from] HashError),

    #[error("failed to access config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config JSON")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: &str, value: impl ToString) -> Self {
        Self::Invalid {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Everything needed to go from a raw frame to a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Height of the display canvas; the rectified card is 80% of it.
    pub target_height: u32,
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_height: 600,
            detector: DetectorConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_height == 0 {
            return Err(ConfigError::invalid("target_height", self.target_height));
        }
        self.detector.validate()?;
        self.matcher.validate()
    }
}
