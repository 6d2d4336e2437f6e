//! Card localization and rectification

pub mod config;
pub mod detector;

pub use config::DetectorConfig;
pub use detector::{CardDetector, Detection, DetectionStats, RectifiedCard};
