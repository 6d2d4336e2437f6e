use crate::fingerprint::{Fingerprint, HashError};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

/// Market price snapshot taken when the catalog was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketPrices {
    pub tcgplayer: Option<f64>,
    pub cardmarket: Option<f64>,
    pub updated_at: Option<String>,
}

impl MarketPrices {
    pub fn is_empty(&self) -> bool {
        self.tcgplayer.is_none() && self.cardmarket.is_none()
    }
}

/// One reference card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub supertype: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtypes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: CardImages,
    #[serde(default)]
    pub market_prices: Option<MarketPrices>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_image: Option<PathBuf>,
    #[serde(skip)]
    fingerprint: Option<Fingerprint>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            rarity: None,
            supertype: None,
            subtypes: Vec::new(),
            images: CardImages::default(),
            market_prices: None,
            image_hash: None,
            local_image: None,
            fingerprint: None,
        }
    }

    /// Attach a stored hash string. It is decoded when the entry joins a catalog.
    pub fn with_image_hash(mut self, hash: impl Into<String>) -> Self {
        self.image_hash = Some(hash.into());
        self.fingerprint = None;
        self
    }

    pub fn with_rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    /// Decoded `image_hash`; `None` when absent or malformed.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub(super) fn decode_fingerprint(&mut self) -> Result<(), HashError> {
        self.fingerprint = None;
        if let Some(hash) = &self.image_hash {
            self.fingerprint = Some(hash.parse()?);
        }
        Ok(())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
