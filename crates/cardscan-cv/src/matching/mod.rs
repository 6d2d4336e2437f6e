//! Catalog lookup for rectified cards

pub mod config;
pub mod matcher;

pub use config::MatcherConfig;
pub use matcher::CardMatcher;
