//! Card Scanner Computer Vision Library
//!
//! OpenCV-backed card localization, rectification and fingerprint matching.
//! Pure data types and the ranking logic live in `cardscan-core`.

pub mod config;
pub mod detection;
pub mod fingerprint;
pub mod matching;
pub mod quad;
pub mod utils;

// Re-export commonly used types
pub use cardscan_core::{Catalog, CardMatch, Diagnostics, Fingerprint, FingerprintScheme};
pub use config::{ConfigError, PipelineConfig};
pub use detection::{CardDetector, Detection, DetectorConfig, RectifiedCard};
pub use fingerprint::CardHasher;
pub use matching::{CardMatcher, MatcherConfig};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use super::*;
    use opencv::core::Mat;

    /// Locates and rectifies a card inside a frame.
    pub trait CardLocator {
        fn locate(
            &self,
            frame: &Mat,
            target_height: u32,
            diag: &mut dyn Diagnostics,
        ) -> Result<Detection>;
    }

    /// Derives a fingerprint from a rectified card image.
    pub trait ImageFingerprinter {
        fn fingerprint(&self, image: &Mat) -> Result<Fingerprint>;
    }
}
