//! Fixed-width hash codes and the two-component card fingerprint.

pub mod code;
pub mod scheme;

pub use code::HashCode;
pub use scheme::{Fingerprint, FingerprintScheme};

use thiserror::Error;

/// Errors raised while decoding hash text or validating a hashing scheme.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("hash code is empty")]
    Empty,

    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidDigit { digit: char, position: usize },

    #[error("fingerprint component {index} is empty")]
    EmptyComponent { index: usize },

    #[error("invalid fingerprint scheme: {reason}")]
    Scheme { reason: String },
}
