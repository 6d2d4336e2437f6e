//! Perceptual fingerprints of rectified card images

pub mod hasher;

pub use hasher::CardHasher;
