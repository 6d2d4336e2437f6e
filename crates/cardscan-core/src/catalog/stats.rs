use super::CatalogEntry;
use serde::Serialize;
use std::fmt;

/// Coverage counts for a loaded catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub with_fingerprint: usize,
    pub with_local_image: usize,
    pub with_api_images: usize,
    pub with_prices: usize,
}

impl CatalogStats {
    pub(super) fn collect(entries: &[CatalogEntry]) -> Self {
        let mut stats = Self {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            if entry.fingerprint().is_some() {
                stats.with_fingerprint += 1;
            }
            if entry.local_image.is_some() {
                stats.with_local_image += 1;
            }
            if entry.images.small.is_some() || entry.images.large.is_some() {
                stats.with_api_images += 1;
            }
            if entry.market_prices.as_ref().is_some_and(|p| !p.is_empty()) {
                stats.with_prices += 1;
            }
        }
        stats
    }

    pub fn missing_fingerprint(&self) -> usize {
        self.total - self.with_fingerprint
    }

    pub fn missing_local_image(&self) -> usize {
        self.total - self.with_local_image
    }

    pub fn missing_api_images(&self) -> usize {
        self.total - self.with_api_images
    }

    pub fn missing_prices(&self) -> usize {
        self.total - self.with_prices
    }
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cards in set: {}", self.total)?;
        writeln!(f, "Cards with usable fingerprints: {}", self.with_fingerprint)?;
        writeln!(f, "Cards with local images: {}", self.with_local_image)?;
        writeln!(f, "Cards with API images: {}", self.with_api_images)?;
        writeln!(f, "Cards with market prices: {}", self.with_prices)?;
        writeln!(f, "Cards missing fingerprints: {}", self.missing_fingerprint())?;
        writeln!(f, "Cards missing local images: {}", self.missing_local_image())?;
        writeln!(f, "Cards missing API images: {}", self.missing_api_images())?;
        write!(f, "Cards missing prices: {}", self.missing_prices())
    }
}
