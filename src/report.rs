//! Human-readable and JSON renderings of a match result

use cardscan_cv::CardMatch;
use std::fmt;

const UNKNOWN: &str = "Unknown";

/// Multi-line terminal report for one match
pub struct TextReport<'a>(pub &'a CardMatch);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        writeln!(f, "Card: {} (#{})", m.name, m.number)?;
        writeln!(f, "Rarity: {}", m.rarity.as_deref().unwrap_or(UNKNOWN))?;
        writeln!(f, "Supertype: {}", m.supertype.as_deref().unwrap_or(UNKNOWN))?;
        if !m.subtypes.is_empty() {
            writeln!(f, "Subtypes: {}", m.subtypes.join(", "))?;
        }
        writeln!(
            f,
            "Confidence: {:.1}% ({} quality, distance {:.2})",
            m.confidence * 100.0,
            m.quality,
            m.distance
        )?;

        if let Some(prices) = &m.market_prices {
            if let Some(p) = prices.tcgplayer {
                writeln!(f, "TCGplayer: ${:.2}", p)?;
            }
            if let Some(p) = prices.cardmarket {
                writeln!(f, "Cardmarket: €{:.2}", p)?;
            }
            if let Some(updated) = &prices.updated_at {
                writeln!(f, "Prices updated: {}", updated)?;
            }
        }
        if let Some(url) = m.images.large.as_deref().or(m.images.small.as_deref()) {
            writeln!(f, "Image: {}", url)?;
        }

        if m.candidates.len() > 1 {
            writeln!(f, "Closest candidates:")?;
            for c in &m.candidates {
                writeln!(f, "  {} (#{}): {:.2}", c.name, c.number, c.distance)?;
            }
        }
        Ok(())
    }
}

/// Pretty JSON document; `null` when nothing matched
pub fn render_json(m: Option<&CardMatch>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&m)
}
