//! Detection configuration

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Card detector configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub edges: EdgeConfig,
    pub contour: ContourConfig,
    pub visualization: VisualizationConfig,
}

/// Blur, Canny and morphology parameters for the edge map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Gaussian kernel side, must be odd (sigma is derived from it)
    pub blur_kernel: i32,
    pub canny_low: f64,
    pub canny_high: f64,
    /// Rectangular structuring element side for dilate / erode
    pub morph_kernel: i32,
    pub dilate_iterations: i32,
    pub erode_iterations: i32,
}

/// Quadrilateral acceptance rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter
    pub approx_epsilon: f64,
    /// Accepted quad area as a fraction of the frame area (min, max)
    pub area_ratio_range: (f64, f64),
    /// Allowed deviation of the normalized aspect ratio from 2.5:3.5
    pub aspect_tolerance: f64,
    /// Optional perimeter bounds in pixels (min, max)
    pub perimeter_range: Option<(f64, f64)>,
}

/// Debug image annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Outline and marker color (r, g, b)
    pub color: (u8, u8, u8),
    pub outline_thickness: i32,
    pub corner_radius: i32,
    pub corner_thickness: i32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 3,
            canny_low: 140.0,
            canny_high: 250.0,
            morph_kernel: 5,
            dilate_iterations: 2,
            erode_iterations: 1,
        }
    }
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            approx_epsilon: 0.05,
            area_ratio_range: (0.10, 0.50),
            aspect_tolerance: 0.2,
            perimeter_range: None,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            color: (0, 255, 0),
            outline_thickness: 3,
            corner_radius: 3,
            corner_thickness: 2,
        }
    }
}

impl DetectorConfig {
    /// Lower Canny thresholds and a wider area window for dim or
    /// low-contrast scenes
    pub fn permissive() -> Self {
        Self {
            edges: EdgeConfig {
                blur_kernel: 5,
                canny_low: 50.0,
                canny_high: 150.0,
                ..Default::default()
            },
            contour: ContourConfig {
                area_ratio_range: (0.05, 0.80),
                aspect_tolerance: 0.25,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Tighter shape rules with a 300..2000 px perimeter window
    pub fn strict() -> Self {
        Self {
            contour: ContourConfig {
                aspect_tolerance: 0.1,
                perimeter_range: Some((300.0, 2000.0)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.edges;
        if e.blur_kernel < 1 || e.blur_kernel % 2 == 0 {
            return Err(ConfigError::invalid("edges.blur_kernel", e.blur_kernel));
        }
        if e.morph_kernel < 1 {
            return Err(ConfigError::invalid("edges.morph_kernel", e.morph_kernel));
        }
        if !(e.canny_low >= 0.0 && e.canny_low <= e.canny_high) {
            return Err(ConfigError::invalid(
                "edges.canny_low/canny_high",
                format!("{}/{}", e.canny_low, e.canny_high),
            ));
        }
        if e.dilate_iterations < 0 || e.erode_iterations < 0 {
            return Err(ConfigError::invalid(
                "edges.dilate_iterations/erode_iterations",
                format!("{}/{}", e.dilate_iterations, e.erode_iterations),
            ));
        }

        let c = &self.contour;
        if !(c.approx_epsilon > 0.0 && c.approx_epsilon < 1.0) {
            return Err(ConfigError::invalid("contour.approx_epsilon", c.approx_epsilon));
        }
        let (lo, hi) = c.area_ratio_range;
        if !(lo >= 0.0 && lo < hi && hi <= 1.0) {
            return Err(ConfigError::invalid(
                "contour.area_ratio_range",
                format!("{:?}", c.area_ratio_range),
            ));
        }
        if !(c.aspect_tolerance >= 0.0) {
            return Err(ConfigError::invalid("contour.aspect_tolerance", c.aspect_tolerance));
        }
        if let Some((lo, hi)) = c.perimeter_range {
            if !(lo >= 0.0 && lo < hi) {
                return Err(ConfigError::invalid(
                    "contour.perimeter_range",
                    format!("{:?}", (lo, hi)),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
        assert!(DetectorConfig::permissive().validate().is_ok());
        assert!(DetectorConfig::strict().validate().is_ok());
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let mut config = DetectorConfig::default();
        config.edges.blur_kernel = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_area_range_is_rejected() {
        let mut config = DetectorConfig::default();
        config.contour.area_ratio_range = (0.5, 0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{ "edges": { "canny_low": 60.0, "canny_high": 120.0 } }"#)
                .unwrap();
        assert_eq!(config.edges.canny_low, 60.0);
        assert_eq!(config.edges.morph_kernel, 5);
        assert_eq!(config.contour, ContourConfig::default());
    }
}
