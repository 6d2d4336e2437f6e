//! Conversions between `image` buffers and OpenCV matrices

use crate::Result;
use anyhow::{Context, bail};
use opencv::{
    core::{CV_8U, CV_8UC3, CV_8UC4, Mat, Scalar, Vector},
    imgcodecs,
    imgproc::{self, COLOR_BGR2GRAY, COLOR_BGR2RGB, COLOR_BGRA2GRAY, COLOR_BGRA2RGB, COLOR_GRAY2RGB},
    prelude::*,
};
use std::path::Path;

/// Image utility functions. OpenCV matrices are kept in BGR / BGRA order.
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image file as a BGR Mat
    pub fn load_color<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgb8();

        Self::rgb_to_mat(&img)
    }

    /// Save Mat as image
    pub fn save_image<P: AsRef<Path>>(mat: &Mat, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();

        let written = imgcodecs::imwrite(&path_str, mat, &Vector::new())
            .with_context(|| format!("Failed to save image: {}", path_str))?;
        if !written {
            bail!("OpenCV refused to write image: {}", path_str);
        }

        Ok(())
    }

    /// Convert image::RgbImage to a BGR Mat
    pub fn rgb_to_mat(rgb_image: &image::RgbImage) -> Result<Mat> {
        let (width, height) = rgb_image.dimensions();
        let rgb = Self::packed_mat(rgb_image.as_raw(), width, height, CV_8UC3)?;

        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)
            .context("Failed to convert RGB to BGR")?;
        Ok(bgr)
    }

    /// Convert image::RgbaImage to a BGRA Mat
    pub fn rgba_to_mat(rgba_image: &image::RgbaImage) -> Result<Mat> {
        let (width, height) = rgba_image.dimensions();
        let rgba = Self::packed_mat(rgba_image.as_raw(), width, height, CV_8UC4)?;

        let mut bgra = Mat::default();
        imgproc::cvt_color_def(&rgba, &mut bgra, imgproc::COLOR_RGBA2BGRA)
            .context("Failed to convert RGBA to BGRA")?;
        Ok(bgra)
    }

    /// Convert any decoded image, keeping the alpha channel when present
    pub fn dynamic_to_mat(img: &image::DynamicImage) -> Result<Mat> {
        if img.color().has_alpha() {
            Self::rgba_to_mat(&img.to_rgba8())
        } else {
            Self::rgb_to_mat(&img.to_rgb8())
        }
    }

    /// Convert a 1, 3 or 4 channel 8-bit Mat to image::RgbImage
    pub fn mat_to_rgb(mat: &Mat) -> Result<image::RgbImage> {
        Self::ensure_8bit(mat)?;

        let code = match mat.channels() {
            1 => COLOR_GRAY2RGB,
            3 => COLOR_BGR2RGB,
            4 => COLOR_BGRA2RGB,
            n => bail!("Unsupported channel count: {}", n),
        };

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(mat, &mut rgb, code).context("Failed to convert Mat to RGB")?;

        let bytes = rgb.data_bytes().context("RGB Mat is not continuous")?.to_vec();
        image::RgbImage::from_raw(rgb.cols() as u32, rgb.rows() as u32, bytes)
            .context("Mat size does not match its pixel buffer")
    }

    /// Single channel view of a gray, BGR or BGRA Mat
    pub fn to_grayscale(mat: &Mat) -> Result<Mat> {
        Self::ensure_8bit(mat)?;

        let code = match mat.channels() {
            1 => return mat.try_clone().context("Failed to copy grayscale Mat"),
            3 => COLOR_BGR2GRAY,
            4 => COLOR_BGRA2GRAY,
            n => bail!("Unsupported channel count: {}", n),
        };

        let mut gray = Mat::default();
        imgproc::cvt_color_def(mat, &mut gray, code).context("Grayscale conversion failed")?;
        Ok(gray)
    }

    fn ensure_8bit(mat: &Mat) -> Result<()> {
        if mat.empty() {
            bail!("Image is empty");
        }
        if mat.depth() != CV_8U {
            bail!("Expected an 8-bit image, got depth {}", mat.depth());
        }
        Ok(())
    }

    fn packed_mat(raw: &[u8], width: u32, height: u32, typ: i32) -> Result<Mat> {
        if width == 0 || height == 0 {
            bail!("Image has no pixels ({}x{})", width, height);
        }

        let mut mat =
            Mat::new_rows_cols_with_default(height as i32, width as i32, typ, Scalar::all(0.0))?;
        mat.data_bytes_mut()?.copy_from_slice(raw);
        Ok(mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_round_trip_keeps_channel_order() -> Result<()> {
        let mut rgb_img = image::RgbImage::new(4, 3);
        rgb_img.put_pixel(1, 2, image::Rgb([200, 10, 30]));

        let mat = ImageUtils::rgb_to_mat(&rgb_img)?;
        assert_eq!(mat.channels(), 3);
        let bgr = *mat.at_2d::<opencv::core::Vec3b>(2, 1)?;
        assert_eq!(bgr.0, [30, 10, 200]);

        let rgb_back = ImageUtils::mat_to_rgb(&mat)?;
        assert_eq!(rgb_img, rgb_back);
        Ok(())
    }

    #[test]
    fn test_rgba_keeps_alpha_channel() -> Result<()> {
        let rgba_img = image::RgbaImage::from_pixel(5, 5, image::Rgba([1, 2, 3, 255]));
        let mat = ImageUtils::rgba_to_mat(&rgba_img)?;
        assert_eq!(mat.channels(), 4);

        let rgb = ImageUtils::mat_to_rgb(&mat)?;
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_grayscale_from_any_channel_count() -> Result<()> {
        let rgb_img = image::RgbImage::from_pixel(6, 4, image::Rgb([90, 90, 90]));
        let bgr = ImageUtils::rgb_to_mat(&rgb_img)?;
        let gray = ImageUtils::to_grayscale(&bgr)?;
        assert_eq!(gray.channels(), 1);
        assert_eq!(*gray.at_2d::<u8>(0, 0)?, 90);

        let again = ImageUtils::to_grayscale(&gray)?;
        assert_eq!(again.size()?, gray.size()?);
        Ok(())
    }

    #[test]
    fn test_empty_image_is_rejected() {
        assert!(ImageUtils::rgb_to_mat(&image::RgbImage::new(0, 0)).is_err());
        assert!(ImageUtils::to_grayscale(&Mat::default()).is_err());
    }
}
