//! Card identification primitives that do not depend on OpenCV.
//!
//! Everything here is plain data and arithmetic: hash codes and fingerprints,
//! the weighted fingerprint distance, corner ordering for detected quads,
//! the reference catalog and the ranking/confidence logic built on top of it.

pub mod catalog;
pub mod diagnostics;
pub mod fingerprint;
pub mod geometry;
pub mod matching;

pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogStats, SetInfo};
pub use diagnostics::Diagnostics;
pub use fingerprint::{Fingerprint, FingerprintScheme, HashCode, HashError};
pub use geometry::{Point2, Quad, card_dimensions, order_corners};
pub use matching::{Candidate, CardMatch, FingerprintIndex, MatchPolicy, MatchQuality};
