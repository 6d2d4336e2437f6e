//! Reference card catalog.
//!
//! The catalog is produced by an external build step as a JSON document:
//!
//! ```json
//! { "set_info": { "name": "Stellar Crown", "set_code": "SV07" },
//!   "cards": [ { "name": "Bulbasaur", "number": "1", "image_hash": "<hex>:<hex>" } ] }
//! ```
//!
//! It is validated once here and is read-only afterwards. Entries that cannot
//! be read are dropped with a warning; entries whose `image_hash` is missing or
//! malformed are kept but never take part in matching.

mod entry;
mod stats;

pub use entry::{CardImages, CatalogEntry, MarketPrices};
pub use stats::CatalogStats;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Catalog load failures. Any of these means the catalog must not be used.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read catalog {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog structure: {reason}")]
    InvalidStructure { reason: String },

    #[error("catalog has no `cards` list")]
    MissingCards,

    #[error("catalog card list is empty")]
    Empty,

    #[error("none of the {total} catalog entries could be read")]
    NoUsableEntries { total: usize },
}

/// Free-form description of the card set the catalog covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetInfo {
    pub name: Option<String>,
    pub series: Option<String>,
    pub set_code: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    set_info: SetInfo,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let catalog = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            entries = catalog.len(),
            with_fingerprint = catalog.stats().with_fingerprint,
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        let Value::Object(mut root) = value else {
            return Err(CatalogError::InvalidStructure {
                reason: "top level must be an object".to_string(),
            });
        };

        let set_info = match root.remove("set_info") {
            Some(Value::Null) | None => SetInfo::default(),
            Some(info) => serde_json::from_value(info)?,
        };

        let cards = match root.remove("cards") {
            Some(Value::Array(cards)) => cards,
            Some(_) => {
                return Err(CatalogError::InvalidStructure {
                    reason: "`cards` must be a list".to_string(),
                });
            }
            None => return Err(CatalogError::MissingCards),
        };

        if cards.is_empty() {
            return Err(CatalogError::Empty);
        }

        let total = cards.len();
        let mut entries = Vec::with_capacity(total);
        for (index, card) in cards.into_iter().enumerate() {
            match serde_json::from_value::<CatalogEntry>(card) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(index, error = %e, "skipping unreadable catalog entry"),
            }
        }

        if entries.is_empty() {
            return Err(CatalogError::NoUsableEntries { total });
        }

        Self::from_entries(set_info, entries)
    }

    /// Build a catalog from already deserialized entries, decoding every
    /// `image_hash` once.
    pub fn from_entries(
        set_info: SetInfo,
        mut entries: Vec<CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        for entry in &mut entries {
            if let Err(e) = entry.decode_fingerprint() {
                tracing::warn!(
                    name = %entry.name,
                    number = %entry.number,
                    error = %e,
                    "catalog entry has an unusable image_hash"
                );
            }
        }

        Ok(Self { set_info, entries })
    }

    pub fn set_info(&self) -> &SetInfo {
        &self.set_info
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with the given collector number.
    pub fn get_by_number(&self, number: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.number == number)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats::collect(&self.entries)
    }

    /// Serialize back into the on-disk document shape.
    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        let doc = serde_json::json!({
            "set_info": self.set_info,
            "cards": self.entries,
        });
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
