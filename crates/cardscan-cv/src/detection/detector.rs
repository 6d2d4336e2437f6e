//! Card detector: edge map -> quadrilateral -> perspective-corrected card

use super::config::DetectorConfig;
use crate::quad::{self, QuadCandidate, Rejection};
use crate::traits::CardLocator;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::{Context, bail};
use cardscan_core::diagnostics::{self, Diagnostics};
use cardscan_core::geometry::{CARD_ASPECT, Quad, card_dimensions, normalized_aspect};
use opencv::{
    core::{BORDER_CONSTANT, Mat, Point, Scalar, Size, Vector},
    imgproc::{self, CHAIN_APPROX_SIMPLE, LINE_8, MORPH_RECT, RETR_EXTERNAL},
    prelude::*,
};
use std::path::Path;

/// A located card, warped onto an upright rectangle
#[derive(Debug, Clone)]
pub struct RectifiedCard {
    pub image: Mat,
    /// Source corners in the frame, TL, TR, BR, BL
    pub quad: Quad,
    /// Quad area over frame area
    pub area_ratio: f64,
}

/// Detection statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionStats {
    pub contours: usize,
    pub candidates: usize,
    pub processing_time_ms: u64,
}

/// Outcome of one detection call. Not finding a card is not an error.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Copy of the frame, annotated when a card was found
    pub debug_image: Mat,
    pub card: Option<RectifiedCard>,
    pub stats: DetectionStats,
}

impl Detection {
    pub fn found(&self) -> bool {
        self.card.is_some()
    }
}

/// Stateless card detector; holds only its configuration
#[derive(Debug, Clone)]
pub struct CardDetector {
    config: DetectorConfig,
}

impl CardDetector {
    /// Create new detector
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate().context("Invalid detector configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect from an image file
    pub fn detect_from_file<P: AsRef<Path>>(
        &self,
        image_path: P,
        target_height: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Detection> {
        let frame = ImageUtils::load_color(&image_path)
            .with_context(|| format!("Failed to load frame: {:?}", image_path.as_ref()))?;
        self.detect(&frame, target_height, diag)
    }

    /// Detect from image::RgbImage
    pub fn detect_from_rgb_image(
        &self,
        rgb_image: &image::RgbImage,
        target_height: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Detection> {
        let frame = ImageUtils::rgb_to_mat(rgb_image)?;
        self.detect(&frame, target_height, diag)
    }

    /// Detect from image::RgbaImage, e.g. a canvas capture
    pub fn detect_from_rgba_image(
        &self,
        rgba_image: &image::RgbaImage,
        target_height: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Detection> {
        let frame = ImageUtils::rgba_to_mat(rgba_image)?;
        self.detect(&frame, target_height, diag)
    }

    /// Core detection on a BGR, BGRA or grayscale frame
    pub fn detect(
        &self,
        frame: &Mat,
        target_height: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Detection> {
        if target_height == 0 {
            bail!("Target height must be positive");
        }
        if frame.empty() {
            bail!("Empty frame");
        }
        let start_time = std::time::Instant::now();

        let edges = self.preprocess(frame)?;
        diagnostics::emit(diag, "Image preprocessed");

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &edges,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction failed")?;
        diagnostics::emit(diag, format!("Found {} contours", contours.len()));

        let frame_area = (frame.rows() as f64) * (frame.cols() as f64);
        let mut candidates = Vec::new();
        for (index, contour) in contours.iter().enumerate() {
            match self.evaluate_contour(index, &contour, frame_area)? {
                Ok(candidate) => {
                    diagnostics::emit(
                        diag,
                        format!(
                            "Found potential card (perimeter: {:.1}, area: {:.1}%)",
                            candidate.perimeter,
                            candidate.area_ratio * 100.0
                        ),
                    );
                    candidates.push(candidate);
                }
                Err(rejection) => {
                    diagnostics::emit(diag, format!("Rejected contour {}: {}", index, rejection));
                }
            }
        }

        let mut stats = DetectionStats {
            contours: contours.len(),
            candidates: candidates.len(),
            processing_time_ms: 0,
        };

        let Some(best) = quad::select_best(&candidates) else {
            diagnostics::emit(diag, "No card detected");
            stats.processing_time_ms = start_time.elapsed().as_millis() as u64;
            return Ok(Detection {
                debug_image: frame.try_clone()?,
                card: None,
                stats,
            });
        };

        let quad = best.ordered()?;
        let debug_image = self.create_debug_image(frame, &quad)?;
        let image = self.rectify(frame, &quad, target_height)?;
        diagnostics::emit(diag, "Card successfully extracted");

        stats.processing_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            contours = stats.contours,
            candidates = stats.candidates,
            area_ratio = best.area_ratio,
            elapsed_ms = stats.processing_time_ms,
            "card located"
        );

        Ok(Detection {
            debug_image,
            card: Some(RectifiedCard {
                image,
                quad,
                area_ratio: best.area_ratio,
            }),
            stats,
        })
    }

    /// Grayscale, blur, Canny, then dilate/erode to close broken edges
    fn preprocess(&self, frame: &Mat) -> Result<Mat> {
        let e = &self.config.edges;
        let gray = ImageUtils::to_grayscale(frame)?;

        let mut blurred = Mat::default();
        let blur_size = Size::new(e.blur_kernel, e.blur_kernel);
        imgproc::gaussian_blur_def(&gray, &mut blurred, blur_size, 0.0)
            .context("Gaussian blur failed")?;

        let mut edges = Mat::default();
        imgproc::canny_def(&blurred, &mut edges, e.canny_low, e.canny_high)
            .context("Canny failed")?;

        let kernel = imgproc::get_structuring_element(
            MORPH_RECT,
            Size::new(e.morph_kernel, e.morph_kernel),
            Point::new(-1, -1),
        )?;
        let border_value = imgproc::morphology_default_border_value()?;

        let mut dilated = Mat::default();
        imgproc::dilate(
            &edges,
            &mut dilated,
            &kernel,
            Point::new(-1, -1),
            e.dilate_iterations,
            BORDER_CONSTANT,
            border_value,
        )
        .context("Dilate failed")?;

        let mut closed = Mat::default();
        imgproc::erode(
            &dilated,
            &mut closed,
            &kernel,
            Point::new(-1, -1),
            e.erode_iterations,
            BORDER_CONSTANT,
            border_value,
        )
        .context("Erode failed")?;

        Ok(closed)
    }

    /// Apply the shape rules to one contour.
    ///
    /// The outer `Result` carries OpenCV failures, the inner one the verdict.
    fn evaluate_contour(
        &self,
        index: usize,
        contour: &Vector<Point>,
        frame_area: f64,
    ) -> Result<std::result::Result<QuadCandidate, Rejection>> {
        let c = &self.config.contour;

        let perimeter = imgproc::arc_length(contour, true)?;
        let mut approx = Vector::<Point>::new();
        imgproc::approx_poly_dp(contour, &mut approx, c.approx_epsilon * perimeter, true)?;

        if approx.len() != 4 {
            return Ok(Err(Rejection::NotQuadrilateral { vertices: approx.len() }));
        }

        if let Some(range) = c.perimeter_range {
            if perimeter < range.0 || perimeter > range.1 {
                return Ok(Err(Rejection::Perimeter { perimeter, range }));
            }
        }

        let area = imgproc::contour_area(&approx, false)?;
        let area_ratio = if frame_area > 0.0 { area / frame_area } else { 0.0 };
        let range = c.area_ratio_range;
        if area_ratio < range.0 || area_ratio > range.1 {
            return Ok(Err(Rejection::Area { ratio: area_ratio, range }));
        }

        let rect = imgproc::min_area_rect(&approx)?;
        let Some(aspect) = normalized_aspect(rect.size.width as f64, rect.size.height as f64) else {
            return Ok(Err(Rejection::Degenerate));
        };
        if (aspect - CARD_ASPECT).abs() > c.aspect_tolerance {
            return Ok(Err(Rejection::Aspect {
                aspect,
                expected: CARD_ASPECT,
                tolerance: c.aspect_tolerance,
            }));
        }

        Ok(Ok(QuadCandidate {
            contour_index: index,
            points: approx,
            perimeter,
            area,
            area_ratio,
            aspect,
        }))
    }

    /// Warp the quad onto an upright card-shaped rectangle
    fn rectify(&self, frame: &Mat, quad: &Quad, target_height: u32) -> Result<Mat> {
        let (width, height) = card_dimensions(target_height);
        if width == 0 || height == 0 {
            bail!("Target height {} is too small for a card", target_height);
        }
        let (w, h) = (width as f32, height as f32);

        let src = quad::quad_to_point2f(quad);
        let dst: Vector<opencv::core::Point2f> = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
            .into_iter()
            .map(|(x, y)| opencv::core::Point2f::new(x, y))
            .collect();

        let transform = imgproc::get_perspective_transform(&src, &dst, opencv::core::DECOMP_LU)
            .context("Perspective transform failed")?;

        let mut card = Mat::default();
        imgproc::warp_perspective(
            frame,
            &mut card,
            &transform,
            Size::new(width as i32, height as i32),
            imgproc::INTER_LINEAR,
            BORDER_CONSTANT,
            Scalar::default(),
        )
        .context("Perspective warp failed")?;

        Ok(card)
    }

    /// Copy of the frame with the quad outline and corner markers
    fn create_debug_image(&self, frame: &Mat, quad: &Quad) -> Result<Mat> {
        let v = &self.config.visualization;
        let color = quad::bgr_scalar(v.color);
        let mut output = frame.try_clone()?;

        let mut outline = Vector::<Vector<Point>>::new();
        outline.push(quad::quad_to_points(quad));
        imgproc::draw_contours(
            &mut output,
            &outline,
            -1,
            color,
            v.outline_thickness,
            LINE_8,
            &opencv::core::no_array(),
            i32::MAX,
            Point::new(0, 0),
        )?;

        for corner in quad::quad_to_points(quad) {
            let (radius, thickness) = (v.corner_radius, v.corner_thickness);
            imgproc::circle(&mut output, corner, radius, color, thickness, LINE_8, 0)?;
        }

        Ok(output)
    }
}

impl CardLocator for CardDetector {
    fn locate(
        &self,
        frame: &Mat,
        target_height: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Detection> {
        self.detect(frame, target_height, diag)
    }
}
