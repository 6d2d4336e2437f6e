//! Card matcher: fingerprint a rectified card and look it up in the catalog

use super::config::MatcherConfig;
use crate::fingerprint::CardHasher;
use crate::Result;
use anyhow::Context;
use cardscan_core::diagnostics::{self, Diagnostics, Silent};
use cardscan_core::matching::best_match_indexed;
use cardscan_core::{CardMatch, Catalog, Fingerprint, FingerprintIndex};
use opencv::core::Mat;
use std::path::Path;
use std::sync::Arc;

/// Matches cards against a shared, read-only catalog.
///
/// A matcher without a catalog is *disabled*: every query answers `None`.
/// Catalog fingerprints are fitted to the configured scheme once, at build.
#[derive(Debug, Clone)]
pub struct CardMatcher {
    catalog: Option<Arc<Catalog>>,
    index: FingerprintIndex,
    hasher: CardHasher,
    config: MatcherConfig,
}

impl CardMatcher {
    /// Create matcher over an already loaded catalog
    pub fn new(catalog: Arc<Catalog>, config: MatcherConfig) -> Result<Self> {
        Self::build(Some(catalog), config)
    }

    /// Matcher that never matches
    pub fn disabled(config: MatcherConfig) -> Result<Self> {
        Self::build(None, config)
    }

    /// Load the catalog from disk; the root cause is a `CatalogError`
    pub fn load<P: AsRef<Path>>(path: P, config: MatcherConfig) -> Result<Self> {
        let path = path.as_ref();
        let catalog = Catalog::from_path(path)
            .with_context(|| format!("Failed to load catalog: {:?}", path))?;
        Self::new(Arc::new(catalog), config)
    }

    /// Like [`CardMatcher::load`], but a catalog failure only disables matching
    pub fn load_or_disabled<P: AsRef<Path>>(path: P, config: MatcherConfig) -> Result<Self> {
        let path = path.as_ref();
        match Catalog::from_path(path) {
            Ok(catalog) => Self::new(Arc::new(catalog), config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "catalog unavailable, matching disabled"
                );
                Self::disabled(config)
            }
        }
    }

    fn build(catalog: Option<Arc<Catalog>>, config: MatcherConfig) -> Result<Self> {
        config.validate().context("Invalid matcher configuration")?;
        let hasher = CardHasher::new(config.scheme.clone())?;
        let index = match &catalog {
            Some(catalog) => FingerprintIndex::build(catalog, &config.scheme),
            None => FingerprintIndex::default(),
        };
        Ok(Self {
            catalog,
            index,
            hasher,
            config,
        })
    }

    pub fn catalog(&self) -> Option<&Arc<Catalog>> {
        self.catalog.as_ref()
    }

    /// Catalog fingerprints fitted to the configured scheme
    pub fn index(&self) -> &FingerprintIndex {
        &self.index
    }

    pub fn is_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn hasher(&self) -> &CardHasher {
        &self.hasher
    }

    /// Fingerprint a rectified card and find its closest catalog entry
    pub fn find_match(
        &self,
        card: &Mat,
        diag: &mut dyn Diagnostics,
    ) -> Result<Option<CardMatch>> {
        if self.catalog.is_none() {
            diagnostics::emit(diag, "Error: No cards in database");
            return Ok(None);
        }

        let query = self.hasher.fingerprint(card)?;
        diagnostics::emit(diag, format!("Card hash: {}", query));
        Ok(self.match_fingerprint(&query, diag))
    }

    /// Look up a precomputed fingerprint
    pub fn match_fingerprint(
        &self,
        query: &Fingerprint,
        diag: &mut dyn Diagnostics,
    ) -> Option<CardMatch> {
        let Some(catalog) = &self.catalog else {
            diagnostics::emit(diag, "Error: No cards in database");
            return None;
        };

        let found = best_match_indexed(query, catalog, &self.index, &self.config.policy, diag);
        match &found {
            Some(m) => tracing::debug!(
                name = %m.name,
                number = %m.number,
                distance = m.distance,
                confidence = m.confidence,
                "best match"
            ),
            None => tracing::debug!("no comparable catalog entry"),
        }
        found
    }

    /// Look up several independent fingerprints, in input order
    #[cfg(feature = "parallel")]
    pub fn match_many(&self, queries: &[Fingerprint]) -> Vec<Option<CardMatch>> {
        use rayon::prelude::*;
        queries
            .par_iter()
            .map(|q| self.match_fingerprint(q, &mut Silent))
            .collect()
    }

    /// Look up several independent fingerprints, in input order
    #[cfg(not(feature = "parallel"))]
    pub fn match_many(&self, queries: &[Fingerprint]) -> Vec<Option<CardMatch>> {
        queries
            .iter()
            .map(|q| self.match_fingerprint(q, &mut Silent))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscan_core::diagnostics::Collected;
    use cardscan_core::{CatalogEntry, CatalogError, MatchQuality, SetInfo};
    use opencv::core::{CV_8UC3, Point, Scalar};
    use opencv::imgproc;

    fn sample_card(radius: i32) -> Result<Mat> {
        let mut card = Mat::new_rows_cols_with_default(400, 286, CV_8UC3, Scalar::all(40.0))?;
        let center = Point::new(90, 120);
        imgproc::circle(&mut card, center, radius, Scalar::all(230.0), -1, imgproc::LINE_8, 0)?;
        Ok(card)
    }

    fn matcher_for(cards: &[(&str, &str, &Mat)]) -> Result<CardMatcher> {
        let hasher = CardHasher::default();
        let mut entries = Vec::new();
        for (name, number, image) in cards {
            let fp = hasher.fingerprint(image)?;
            entries.push(CatalogEntry::new(*name, *number).with_image_hash(fp.to_string()));
        }
        let catalog = Catalog::from_entries(SetInfo::default(), entries)?;
        CardMatcher::new(Arc::new(catalog), MatcherConfig::default())
    }

    #[test]
    fn test_exact_card_matches_with_full_confidence() -> Result<()> {
        let a = sample_card(60)?;
        let b = Mat::new_rows_cols_with_default(400, 286, CV_8UC3, Scalar::all(200.0))?;
        let matcher = matcher_for(&[("Flat", "2", &b), ("Circle", "1", &a)])?;

        let mut diag = Collected::default();
        let found = matcher.find_match(&a, &mut diag)?.context("no match")?;

        assert_eq!(found.name, "Circle");
        assert_eq!(found.number, "1");
        assert_eq!(found.distance, 0.0);
        assert_eq!(found.confidence, 1.0);
        assert_eq!(found.quality, MatchQuality::High);
        assert!(diag.messages.iter().any(|m| m.starts_with("Top 3 matches")));
        Ok(())
    }

    #[test]
    fn test_disabled_matcher_answers_none() -> Result<()> {
        let matcher = CardMatcher::disabled(MatcherConfig::default())?;
        assert!(!matcher.is_enabled());

        let mut diag = Collected::default();
        assert!(matcher.find_match(&sample_card(60)?, &mut diag)?.is_none());
        assert_eq!(diag.messages, vec!["Error: No cards in database".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_catalog_file() -> Result<()> {
        let path = std::env::temp_dir().join("cardscan-missing-catalog.json");
        let err = CardMatcher::load(&path, MatcherConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::NotFound { .. })
        ));

        let matcher = CardMatcher::load_or_disabled(&path, MatcherConfig::default())?;
        assert!(!matcher.is_enabled());
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected() -> Result<()> {
        let catalog = Arc::new(Catalog::from_entries(
            SetInfo::default(),
            vec![CatalogEntry::new("A", "1").with_image_hash("0:0")],
        )?);
        let config = MatcherConfig::default().with_threshold(-1.0);
        assert!(CardMatcher::new(catalog, config).is_err());
        Ok(())
    }

    #[test]
    fn test_match_many_keeps_input_order() -> Result<()> {
        let a = sample_card(60)?;
        let b = sample_card(120)?;
        let matcher = matcher_for(&[("Small", "1", &a), ("Large", "2", &b)])?;

        let hasher = matcher.hasher();
        let queries = vec![hasher.fingerprint(&b)?, hasher.fingerprint(&a)?];
        let results = matcher.match_many(&queries);

        let names: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().map(|m| m.name.as_str()))
            .collect();
        assert_eq!(names, vec![Some("Large"), Some("Small")]);
        Ok(())
    }

    #[test]
    fn test_catalog_from_another_hash_size_is_not_matched() -> Result<()> {
        let card = sample_card(60)?;
        let catalog = {
            let narrow = matcher_for(&[("Circle", "1", &card)])?;
            narrow.catalog().cloned().context("catalog missing")?
        };

        let mut config = MatcherConfig::default();
        config.scheme.hash_size = 16;
        let matcher = CardMatcher::new(catalog, config)?;
        assert_eq!(matcher.index().len(), 1);
        assert_eq!(matcher.index().comparable(), 0);

        let query = matcher.hasher().fingerprint(&card)?;
        assert!(query.components().iter().all(|c| c.bit_len() == 256));
        assert!(matcher.find_match(&card, &mut Silent)?.is_none());
        Ok(())
    }
}
