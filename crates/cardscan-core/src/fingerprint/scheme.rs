//! Fingerprints and the weighted multi-hash distance between them.

use super::{HashCode, HashError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Separator between components in the text form of a fingerprint.
pub const COMPONENT_SEPARATOR: char = ':';

/// Ordered hash components derived from one card image.
///
/// Component 0 is the structural (average) hash and component 1 the gradient
/// (difference) hash. Order is part of the catalog encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    components: Vec<HashCode>,
}

impl Fingerprint {
    pub fn new(components: Vec<HashCode>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[HashCode] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Parse `"<hex><sep><hex>..."`. Any number of components is accepted;
    /// the scheme decides at comparison time whether the count fits.
    pub fn parse_with(text: &str, separator: char) -> Result<Self, HashError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HashError::Empty);
        }

        let components = text
            .split(separator)
            .enumerate()
            .map(|(index, part)| {
                if part.trim().is_empty() {
                    Err(HashError::EmptyComponent { index })
                } else {
                    HashCode::from_hex(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn to_string_with(&self, separator: char) -> String {
        self.components
            .iter()
            .map(HashCode::to_hex)
            .collect::<Vec<_>>()
            .join(&separator.to_string())
    }
}

impl FromStr for Fingerprint {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, COMPONENT_SEPARATOR)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(COMPONENT_SEPARATOR))
    }
}

/// Hash composition shared by the fingerprint producer and the matcher.
///
/// Catalog fingerprints and query fingerprints are only comparable when both
/// were produced under the same scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintScheme {
    /// Side of the downscaled grid; each component carries `hash_size²` bits.
    pub hash_size: u32,
    /// Weight of the structural (average) hash distance.
    pub structural_weight: f64,
    /// Weight of the gradient (difference) hash distance.
    pub gradient_weight: f64,
}

impl Default for FingerprintScheme {
    fn default() -> Self {
        Self {
            hash_size: 8,
            structural_weight: 0.6,
            gradient_weight: 0.4,
        }
    }
}

impl FingerprintScheme {
    /// Number of components a comparable fingerprint carries.
    pub const COMPONENTS: usize = 2;

    pub fn component_bits(&self) -> usize {
        (self.hash_size as usize).pow(2)
    }

    pub fn weights(&self) -> [f64; Self::COMPONENTS] {
        [self.structural_weight, self.gradient_weight]
    }

    pub fn validate(&self) -> Result<(), HashError> {
        if self.hash_size < 2 {
            return Err(HashError::Scheme {
                reason: format!("hash_size must be at least 2, got {}", self.hash_size),
            });
        }
        let weights = self.weights();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(HashError::Scheme {
                reason: format!("weights must be finite and non-negative, got {:?}", weights),
            });
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(HashError::Scheme {
                reason: "at least one weight must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Hex digits per component in the text encoding.
    pub fn component_hex_digits(&self) -> usize {
        self.component_bits().div_ceil(4)
    }

    /// A component at exactly `component_bits()` bits.
    ///
    /// Only codes written with `component_hex_digits()` digits qualify. Inside
    /// that width the padding bits above `component_bits()` must be zero.
    fn fit<'a>(&self, code: &'a HashCode) -> Option<Cow<'a, HashCode>> {
        let bits = self.component_bits();
        if code.bit_len() == bits {
            return Some(Cow::Borrowed(code));
        }
        if code.bit_len().div_ceil(4) != self.component_hex_digits() {
            return None;
        }
        code.resized(bits).map(Cow::Owned)
    }

    /// `fp` with every component at the scheme's bit width, or `None` when
    /// it was not produced under this scheme.
    pub fn normalize(&self, fp: &Fingerprint) -> Option<Fingerprint> {
        if fp.len() != Self::COMPONENTS {
            return None;
        }
        fp.components
            .iter()
            .map(|c| self.fit(c).map(Cow::into_owned))
            .collect::<Option<Vec<_>>>()
            .map(Fingerprint::new)
    }

    /// Per-component Hamming distances at the scheme's width.
    ///
    /// `None` when either side has the wrong component count or a component
    /// of a different width than the scheme emits.
    pub fn component_distances(&self, a: &Fingerprint, b: &Fingerprint) -> Option<[u32; 2]> {
        if a.len() != Self::COMPONENTS || b.len() != Self::COMPONENTS {
            return None;
        }

        let mut out = [0u32; Self::COMPONENTS];
        for (slot, (x, y)) in out.iter_mut().zip(a.components.iter().zip(&b.components)) {
            let x = self.fit(x)?;
            let y = self.fit(y)?;
            *slot = x.hamming(&y)?;
        }
        Some(out)
    }

    /// Weighted match distance; `f64::INFINITY` marks a non-comparable pair.
    pub fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> f64 {
        match self.component_distances(a, b) {
            Some(parts) => parts
                .iter()
                .zip(self.weights())
                .map(|(d, w)| *d as f64 * w)
                .sum(),
            None => f64::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fp(text: &str) -> Fingerprint {
        text.parse().unwrap()
    }

    #[test]
    fn parses_and_prints_two_components() {
        let f = fp("ff00ff00ff00ff00:0123456789abcdef");
        assert_eq!(f.len(), 2);
        assert_eq!(f.to_string(), "ff00ff00ff00ff00:0123456789abcdef");
    }

    #[test]
    fn empty_component_is_an_error() {
        assert_eq!(
            "ff00ff00ff00ff00:".parse::<Fingerprint>(),
            Err(HashError::EmptyComponent { index: 1 })
        );
    }

    #[test]
    fn self_distance_is_zero() {
        let scheme = FingerprintScheme::default();
        let f = fp("c3a5000011112222:7e7e7e7e00ff00ff");
        assert_eq!(scheme.distance(&f, &f), 0.0);
    }

    #[test]
    fn distance_is_weighted_sum() {
        let scheme = FingerprintScheme::default();
        // 4 structural bits and 8 gradient bits differ
        let a = fp("0000000000000000:0000000000000000");
        let b = fp("000000000000000f:00000000000000ff");
        assert_eq!(scheme.component_distances(&a, &b), Some([4, 8]));
        assert_relative_eq!(scheme.distance(&a, &b), 4.0 * 0.6 + 8.0 * 0.4);
        assert_relative_eq!(scheme.distance(&b, &a), scheme.distance(&a, &b));
    }

    #[test]
    fn component_count_mismatch_is_infinite() {
        let scheme = FingerprintScheme::default();
        let two = fp("0000000000000000:0000000000000000");
        let four = fp("0000000000000000:0000000000000000:0000000000000000:00000000");
        let one = fp("0000000000000000");
        assert!(scheme.distance(&two, &four).is_infinite());
        assert!(scheme.distance(&four, &two).is_infinite());
        assert!(scheme.distance(&one, &two).is_infinite());
    }

    #[test]
    fn oversized_component_is_infinite() {
        let scheme = FingerprintScheme::default();
        let a = fp("0000000000000000:0000000000000000");
        let wide = fp("ffffffffffffffffff:0000000000000000");
        assert!(scheme.distance(&a, &wide).is_infinite());
    }

    #[test]
    fn leading_zeros_inside_the_width_still_match() {
        let scheme = FingerprintScheme::default();
        let a = fp("00000000000000ff:0000000000000001");
        let b = fp("00000000000000FF:0000000000000001");
        assert_eq!(scheme.distance(&a, &b), 0.0);
    }

    #[test]
    fn narrower_components_are_not_comparable() {
        let scheme = FingerprintScheme::default();
        let a = fp("00000000000000ff:0000000000000001");
        // 56-bit difference hash written with 14 digits
        let legacy = fp("00000000000000ff:00000000000001");
        assert!(scheme.distance(&a, &fp("ff:1")).is_infinite());
        assert!(scheme.distance(&a, &legacy).is_infinite());
        assert_eq!(scheme.component_distances(&legacy, &a), None);
    }

    #[test]
    fn other_hash_size_is_not_comparable() {
        let wide = FingerprintScheme {
            hash_size: 16,
            ..Default::default()
        };
        let full = "0".repeat(wide.component_hex_digits());
        let native = fp(&format!("{full}:{full}"));
        let eight_bit_grid = fp("0000000000000003:0000000000000000");

        assert_eq!(wide.component_hex_digits(), 64);
        assert_eq!(wide.distance(&native, &native), 0.0);
        assert!(wide.distance(&native, &eight_bit_grid).is_infinite());
        assert!(wide.distance(&eight_bit_grid, &native).is_infinite());
        assert!(wide.normalize(&eight_bit_grid).is_none());
        // and the other way round
        assert!(FingerprintScheme::default().distance(&eight_bit_grid, &native).is_infinite());
    }

    #[test]
    fn odd_grid_drops_only_zero_padding() {
        // 3x3 grid: 9 bits written as 3 hex digits
        let scheme = FingerprintScheme {
            hash_size: 3,
            ..Default::default()
        };
        let a = fp("1ff:000");
        let b = fp("0ff:000");
        let normalized = scheme.normalize(&a).unwrap();
        assert!(normalized.components().iter().all(|c| c.bit_len() == 9));
        assert_eq!(scheme.component_distances(&a, &b), Some([1, 0]));
        // a set bit above the 9th is outside the scheme
        assert!(scheme.distance(&fp("2ff:000"), &b).is_infinite());
    }

    #[test]
    fn custom_weights_apply() {
        let scheme = FingerprintScheme {
            structural_weight: 1.0,
            gradient_weight: 0.0,
            ..Default::default()
        };
        let a = fp("0000000000000000:0000000000000000");
        let b = fp("0000000000000003:ffffffffffffffff");
        assert_relative_eq!(scheme.distance(&a, &b), 2.0);
    }

    #[test]
    fn validate_rejects_bad_schemes() {
        assert!(FingerprintScheme::default().validate().is_ok());
        let zero = FingerprintScheme {
            structural_weight: 0.0,
            gradient_weight: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let negative = FingerprintScheme {
            gradient_weight: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let tiny = FingerprintScheme {
            hash_size: 1,
            ..Default::default()
        };
        assert!(tiny.validate().is_err());
    }
}
