//! Nearest-neighbour search over the catalog and confidence derivation.

use crate::catalog::{CardImages, Catalog, CatalogEntry, MarketPrices};
use crate::diagnostics::{self, Diagnostics};
use crate::fingerprint::{Fingerprint, FingerprintScheme};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse label for a match: `High` when the distance is under the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchQuality {
    High,
    Low,
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchQuality::High => "High",
            MatchQuality::Low => "Low",
        })
    }
}

/// Threshold and report size used when picking a winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Distance at which confidence reaches zero.
    pub threshold: f64,
    /// Ranked candidates kept for diagnostics.
    pub top_n: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: 24.0,
            top_n: 3,
        }
    }
}

/// One ranked catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Position in the catalog.
    pub index: usize,
    pub name: String,
    pub number: String,
    pub distance: f64,
}

/// Best catalog entry for a query, with its metadata copied out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardMatch {
    pub name: String,
    pub number: String,
    pub rarity: Option<String>,
    pub supertype: Option<String>,
    pub subtypes: Vec<String>,
    pub images: CardImages,
    pub market_prices: Option<MarketPrices>,
    pub confidence: f64,
    pub distance: f64,
    pub quality: MatchQuality,
    /// Closest entries, ascending by distance, winner first.
    pub candidates: Vec<Candidate>,
}

impl CardMatch {
    fn from_entry(
        entry: &CatalogEntry,
        distance: f64,
        threshold: f64,
        candidates: Vec<Candidate>,
    ) -> Self {
        let (confidence, quality) = assess(distance, threshold);
        Self {
            name: entry.name.clone(),
            number: entry.number.clone(),
            rarity: entry.rarity.clone(),
            supertype: entry.supertype.clone(),
            subtypes: entry.subtypes.clone(),
            images: entry.images.clone(),
            market_prices: entry.market_prices.clone(),
            confidence,
            distance,
            quality,
            candidates,
        }
    }
}

/// `clamp(1 - distance / threshold, 0, 1)`.
pub fn confidence(distance: f64, threshold: f64) -> f64 {
    if !(threshold > 0.0) {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance / threshold).clamp(0.0, 1.0)
}

pub fn assess(distance: f64, threshold: f64) -> (f64, MatchQuality) {
    let quality = if distance < threshold {
        MatchQuality::High
    } else {
        MatchQuality::Low
    };
    (confidence(distance, threshold), quality)
}

/// Catalog fingerprints fitted to one scheme, computed once and reused for
/// every query against that catalog.
///
/// Slot `i` belongs to catalog entry `i`; `None` marks an entry without a
/// fingerprint or one produced under another scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerprintIndex {
    scheme: FingerprintScheme,
    fitted: Vec<Option<Fingerprint>>,
}

impl FingerprintIndex {
    pub fn build(catalog: &Catalog, scheme: &FingerprintScheme) -> Self {
        let fitted: Vec<Option<Fingerprint>> = catalog
            .iter()
            .map(|entry| entry.fingerprint().and_then(|fp| scheme.normalize(fp)))
            .collect();

        let comparable = fitted.iter().flatten().count();
        let with_fingerprint = catalog.stats().with_fingerprint;
        if comparable < with_fingerprint {
            tracing::warn!(
                comparable,
                with_fingerprint,
                hash_size = scheme.hash_size,
                "some catalog fingerprints were built under another scheme"
            );
        }

        Self {
            scheme: scheme.clone(),
            fitted,
        }
    }

    pub fn scheme(&self) -> &FingerprintScheme {
        &self.scheme
    }

    pub fn len(&self) -> usize {
        self.fitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fitted.is_empty()
    }

    /// Entries that can be ranked under this scheme.
    pub fn comparable(&self) -> usize {
        self.fitted.iter().flatten().count()
    }

    pub fn get(&self, index: usize) -> Option<&Fingerprint> {
        self.fitted.get(index)?.as_ref()
    }

    /// Distance from `query` to every comparable slot, ascending.
    ///
    /// Equal distances keep catalog order.
    fn ranked_distances(&self, query: &Fingerprint) -> Vec<(usize, f64)> {
        let Some(query) = self.scheme.normalize(query) else {
            return Vec::new();
        };

        let mut ranked: Vec<(usize, f64)> = slot_distances(&query, &self.fitted, &self.scheme)
            .into_iter()
            .filter_map(|(index, distance)| Some((index, distance?)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }
}

#[cfg(feature = "parallel")]
fn slot_distances(
    query: &Fingerprint,
    fitted: &[Option<Fingerprint>],
    scheme: &FingerprintScheme,
) -> Vec<(usize, Option<f64>)> {
    use rayon::prelude::*;
    fitted
        .par_iter()
        .enumerate()
        .map(|(index, slot)| (index, comparable_distance(query, slot.as_ref(), scheme)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn slot_distances(
    query: &Fingerprint,
    fitted: &[Option<Fingerprint>],
    scheme: &FingerprintScheme,
) -> Vec<(usize, Option<f64>)> {
    fitted
        .iter()
        .enumerate()
        .map(|(index, slot)| (index, comparable_distance(query, slot.as_ref(), scheme)))
        .collect()
}

fn comparable_distance(
    query: &Fingerprint,
    fitted: Option<&Fingerprint>,
    scheme: &FingerprintScheme,
) -> Option<f64> {
    let distance = scheme.distance(query, fitted?);
    distance.is_finite().then_some(distance)
}

/// Distance from `query` to every comparable entry, ascending.
///
/// Entries without a fingerprint and non-comparable pairs are left out.
/// Equal distances keep catalog order. Fits the catalog on every call; use
/// [`rank_indexed`] when querying the same catalog repeatedly.
pub fn rank_candidates(
    query: &Fingerprint,
    catalog: &Catalog,
    scheme: &FingerprintScheme,
) -> Vec<Candidate> {
    rank_indexed(query, catalog, &FingerprintIndex::build(catalog, scheme))
}

/// [`rank_candidates`] over an index built from the same catalog.
pub fn rank_indexed(
    query: &Fingerprint,
    catalog: &Catalog,
    index: &FingerprintIndex,
) -> Vec<Candidate> {
    debug_assert_eq!(index.len(), catalog.len());

    index
        .ranked_distances(query)
        .into_iter()
        .filter_map(|(slot, distance)| {
            let entry = catalog.entries().get(slot)?;
            Some(Candidate {
                index: slot,
                name: entry.name.clone(),
                number: entry.number.clone(),
                distance,
            })
        })
        .collect()
}

/// Pick the closest entry and derive its confidence.
///
/// Returns `None` for an empty catalog or when no entry is comparable.
pub fn best_match(
    query: &Fingerprint,
    catalog: &Catalog,
    scheme: &FingerprintScheme,
    policy: &MatchPolicy,
    diag: &mut dyn Diagnostics,
) -> Option<CardMatch> {
    let index = FingerprintIndex::build(catalog, scheme);
    best_match_indexed(query, catalog, &index, policy, diag)
}

/// [`best_match`] over an index built from the same catalog.
pub fn best_match_indexed(
    query: &Fingerprint,
    catalog: &Catalog,
    index: &FingerprintIndex,
    policy: &MatchPolicy,
    diag: &mut dyn Diagnostics,
) -> Option<CardMatch> {
    if catalog.is_empty() {
        diagnostics::emit(diag, "Error: No cards in database");
        return None;
    }

    let mut ranked = rank_indexed(query, catalog, index);

    diagnostics::emit(diag, format!("Top {} matches:", policy.top_n));
    for candidate in ranked.iter().take(policy.top_n) {
        diagnostics::emit(
            diag,
            format!(
                "{} (#{}): diff = {:.2}",
                candidate.name, candidate.number, candidate.distance
            ),
        );
    }

    let best = ranked.first()?.clone();
    ranked.truncate(policy.top_n.max(1));

    let entry = &catalog.entries()[best.index];
    Some(CardMatch::from_entry(entry, best.distance, policy.threshold, ranked))
}
