//! Average and difference hashes over a downscaled grayscale card.
//!
//! Both hashes shrink the card to a grid of `hash_size` rows before
//! thresholding, so small shifts, blur and JPEG noise flip few bits.
//! Bits are emitted row-major, most significant first.

use crate::traits::ImageFingerprinter;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::{Context, bail};
use cardscan_core::{Fingerprint, FingerprintScheme, HashCode};
use opencv::{
    core::{Mat, Size},
    imgproc,
    prelude::*,
};

/// Computes fingerprints under a fixed scheme
#[derive(Debug, Clone, Default)]
pub struct CardHasher {
    scheme: FingerprintScheme,
}

impl CardHasher {
    pub fn new(scheme: FingerprintScheme) -> Result<Self> {
        scheme.validate().context("Invalid fingerprint scheme")?;
        Ok(Self { scheme })
    }

    pub fn scheme(&self) -> &FingerprintScheme {
        &self.scheme
    }

    /// Structural then gradient component, in the scheme's component order
    pub fn fingerprint(&self, image: &Mat) -> Result<Fingerprint> {
        if image.empty() {
            bail!("Cannot fingerprint an empty image");
        }
        let gray = ImageUtils::to_grayscale(image)?;
        let structural = self.average_hash(&gray)?;
        let gradient = self.difference_hash(&gray)?;
        Ok(Fingerprint::new(vec![structural, gradient]))
    }

    /// Fingerprint an image file on disk
    pub fn fingerprint_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<Fingerprint> {
        let image = ImageUtils::load_color(&path)?;
        self.fingerprint(&image)
    }

    /// Bit set where the cell is brighter than the grid mean
    fn average_hash(&self, gray: &Mat) -> Result<HashCode> {
        let n = self.scheme.hash_size as usize;
        let cells = shrink(gray, n, n)?;

        let mean = cells.iter().map(|&v| v as f64).sum::<f64>() / cells.len() as f64;
        let bits: Vec<bool> = cells.iter().map(|&v| v as f64 > mean).collect();
        Ok(HashCode::from_bits(&bits))
    }

    /// Bit set where a pixel is brighter than its left neighbour
    fn difference_hash(&self, gray: &Mat) -> Result<HashCode> {
        let n = self.scheme.hash_size as usize;
        let cells = shrink(gray, n + 1, n)?;

        let bits: Vec<bool> = cells
            .chunks_exact(n + 1)
            .flat_map(|row| row.windows(2).map(|pair| pair[1] > pair[0]))
            .collect();
        Ok(HashCode::from_bits(&bits))
    }
}

impl ImageFingerprinter for CardHasher {
    fn fingerprint(&self, image: &Mat) -> Result<Fingerprint> {
        CardHasher::fingerprint(self, image)
    }
}

/// Area-resample a single-channel image to `width` x `height`, row-major bytes
fn shrink(gray: &Mat, width: usize, height: usize) -> Result<Vec<u8>> {
    let mut small = Mat::default();
    imgproc::resize(
        gray,
        &mut small,
        Size::new(width as i32, height as i32),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )
    .context("Hash downscale failed")?;

    if !small.is_continuous() {
        small = small.try_clone()?;
    }
    let bytes = small.data_bytes().context("Downscaled image is not readable")?;
    if bytes.len() != width * height {
        bail!("Unexpected downscale size: {} bytes for {}x{}", bytes.len(), width, height);
    }
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC1, CV_8UC3, Point, Rect, Scalar};

    /// Dark card with a bright square in the upper left quadrant
    fn sample_card() -> Result<Mat> {
        let mut card = Mat::new_rows_cols_with_default(400, 286, CV_8UC3, Scalar::all(30.0))?;
        imgproc::rectangle(
            &mut card,
            Rect::new(20, 20, 120, 160),
            Scalar::new(200.0, 180.0, 160.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;
        let white = Scalar::all(255.0);
        imgproc::circle(&mut card, Point::new(200, 300), 50, white, -1, imgproc::LINE_8, 0)?;
        Ok(card)
    }

    #[test]
    fn test_fingerprint_is_deterministic() -> Result<()> {
        let hasher = CardHasher::default();
        let card = sample_card()?;

        let a = hasher.fingerprint(&card)?;
        let b = hasher.fingerprint(&card)?;

        assert_eq!(a, b);
        assert_eq!(hasher.scheme().distance(&a, &b), 0.0);
        Ok(())
    }

    #[test]
    fn test_fingerprint_text_shape() -> Result<()> {
        let hasher = CardHasher::default();
        let text = hasher.fingerprint(&sample_card()?)?.to_string();

        let parts: Vec<&str> = text.split(':').collect();
        assert_eq!(parts.len(), 2);
        for part in parts {
            assert_eq!(part.len(), 16);
            assert!(part.chars().all(|c| c.is_ascii_hexdigit()));
        }
        Ok(())
    }

    #[test]
    fn test_average_hash_marks_bright_region() -> Result<()> {
        let hasher = CardHasher::default();
        let mut gray = Mat::new_rows_cols_with_default(80, 80, CV_8UC1, Scalar::all(0.0))?;
        // left half bright
        let left_half = Rect::new(0, 0, 40, 80);
        imgproc::rectangle(&mut gray, left_half, Scalar::all(255.0), -1, imgproc::LINE_8, 0)?;

        let code = hasher.average_hash(&gray)?;
        assert_eq!(code.bit_len(), 64);
        for row in 0..8 {
            for col in 0..8 {
                assert_eq!(code.bit(row * 8 + col), col < 4, "row {} col {}", row, col);
            }
        }
        Ok(())
    }

    #[test]
    fn test_difference_hash_follows_gradient() -> Result<()> {
        let hasher = CardHasher::default();
        let mut ramp = Mat::new_rows_cols_with_default(32, 90, CV_8UC1, Scalar::all(0.0))?;
        for row in 0..32 {
            for col in 0..90 {
                *ramp.at_2d_mut::<u8>(row, col)? = (col * 2) as u8;
            }
        }

        let rising = hasher.difference_hash(&ramp)?;
        assert!(rising.bits().all(|b| b));

        let mut falling = Mat::default();
        opencv::core::flip(&ramp, &mut falling, 1)?;
        let falling = hasher.difference_hash(&falling)?;
        assert!(falling.bits().all(|b| !b));
        Ok(())
    }

    #[test]
    fn test_flat_image_hashes_to_zero() -> Result<()> {
        let hasher = CardHasher::default();
        let flat = Mat::new_rows_cols_with_default(100, 70, CV_8UC3, Scalar::all(128.0))?;
        let fp = hasher.fingerprint(&flat)?;
        assert_eq!(fp.to_string(), "0000000000000000:0000000000000000");
        Ok(())
    }

    #[test]
    fn test_small_edit_moves_distance_a_little() -> Result<()> {
        let hasher = CardHasher::default();
        let card = sample_card()?;
        let mut edited = card.try_clone()?;
        let patch = Rect::new(240, 20, 30, 30);
        imgproc::rectangle(&mut edited, patch, Scalar::all(255.0), -1, imgproc::LINE_8, 0)?;

        let a = hasher.fingerprint(&card)?;
        let b = hasher.fingerprint(&edited)?;
        let d = hasher.scheme().distance(&a, &b);
        assert!(d > 0.0 && d < 24.0, "distance {}", d);
        Ok(())
    }

    #[test]
    fn test_larger_hash_size_widens_components() -> Result<()> {
        let hasher = CardHasher::new(FingerprintScheme {
            hash_size: 16,
            ..FingerprintScheme::default()
        })?;
        let fp = hasher.fingerprint(&sample_card()?)?;
        assert!(fp.components().iter().all(|c| c.bit_len() == 256));
        assert!(CardHasher::new(FingerprintScheme { hash_size: 1, ..Default::default() }).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let hasher = CardHasher::default();
        assert!(hasher.fingerprint(&Mat::default()).is_err());
    }
}
