//! Tunable thresholds for every stage, with documented defaults.
//!
//! A config file only needs to name the values it changes:
//!
//! ```toml
//! parallel = false
//!
//! [detector]
//! min_area = 1500
//! max_area = 60000
//! size_split = { area = 9000 }
//!
//! [remover]
//! bg_tolerance = 40
//! strategy = "flood_fill"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{ErrorKind, IconError};
use crate::{icon_err, icon_try};

/// Upper bound for `crop_margin`; no screenshot has icons this far apart
pub const MAX_CROP_MARGIN: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub detector: DetectorConfig,
    pub extractor: ExtractorConfig,
    pub remover: RemoverConfig,
    /// Process candidates on the rayon thread pool
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            extractor: ExtractorConfig::default(),
            remover: RemoverConfig::default(),
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Smallest accepted bounding-box area, in pixels
    pub min_area: u32,
    /// Largest accepted bounding-box area, in pixels
    pub max_area: u32,
    /// Lower bound of the width/height ratio
    pub aspect_min: f64,
    /// Upper bound of the width/height ratio
    pub aspect_max: f64,
    /// Boxes whose IoU with an already accepted box exceeds this are dropped
    pub overlap_threshold: f64,
    /// Sobel gradient magnitude at which a pixel counts as an edge
    pub edge_threshold: u16,
    /// Both sides of a box must be longer than this
    pub min_side: u32,
    /// Share of the squared box that must lie inside the screenshot
    pub min_inside_fraction: f64,
    /// Extra pixels of surrounding screen added on every side of the square crop.
    /// The background color is sampled from these, so keep it at least
    /// `border_sample_width - 1`.
    pub crop_margin: u32,
    pub size_split: SizeSplit,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 1000,
            max_area: 50000,
            aspect_min: 0.7,
            aspect_max: 1.3,
            overlap_threshold: 0.3,
            edge_threshold: 48,
            min_side: 30,
            min_inside_fraction: 0.9,
            crop_margin: 4,
            size_split: SizeSplit::Auto,
        }
    }
}

/// How accepted boxes are divided into small and large icons.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSplit {
    /// Split at the largest relative jump between the sorted box areas,
    /// if that jump is at least 1.5x. Otherwise every box is small.
    Auto,
    /// Boxes with an area strictly above this are large.
    Area(u32),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Side of the final small icon
    pub small_output: u32,
    /// Side of the final large icon
    pub large_output: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            small_output: 86,
            large_output: 157,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoverConfig {
    /// Maximum per-channel distance from the background estimate
    pub bg_tolerance: u8,
    /// Width of the outer ring sampled for the background color
    pub border_sample_width: u32,
    pub strategy: RemovalStrategy,
    /// Pixels less opaque than this become fully transparent. 0 disables it.
    pub alpha_floor: u8,
}

impl Default for RemoverConfig {
    fn default() -> Self {
        Self {
            bg_tolerance: 60,
            border_sample_width: 2,
            strategy: RemovalStrategy::Global,
            alpha_floor: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStrategy {
    /// Clear every pixel close to the background color, wherever it is
    Global,
    /// Clear only background-colored pixels connected to the border
    FloodFill,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, IconError> {
        let config: Config = icon_try!(ErrorKind::InvalidConfig, toml::from_str(text));
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, IconError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            icon_err!(
                ErrorKind::InvalidConfig,
                "unable to read config '{}': {e}",
                path.display()
            )
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), IconError> {
        let d = &self.detector;
        if d.min_area > d.max_area {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "min_area {} is larger than max_area {}",
                d.min_area,
                d.max_area
            ));
        }
        if !(d.aspect_min > 0.0 && d.aspect_min <= d.aspect_max) {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "aspect ratio band {}..{} is empty or not positive",
                d.aspect_min,
                d.aspect_max
            ));
        }
        if !(0.0..=1.0).contains(&d.overlap_threshold) {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "overlap_threshold must be within 0..=1, got {}",
                d.overlap_threshold
            ));
        }
        if !(0.0..=1.0).contains(&d.min_inside_fraction) {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "min_inside_fraction must be within 0..=1, got {}",
                d.min_inside_fraction
            ));
        }
        if d.crop_margin > MAX_CROP_MARGIN {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "crop_margin must be at most {MAX_CROP_MARGIN}, got {}",
                d.crop_margin
            ));
        }
        if self.extractor.small_output == 0 || self.extractor.large_output == 0 {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "output icon sizes must be non-zero"
            ));
        }
        if self.remover.border_sample_width == 0 {
            return Err(icon_err!(
                ErrorKind::InvalidConfig,
                "border_sample_width must be at least 1"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.detector.overlap_threshold, 0.3);
        assert_eq!(config.detector.aspect_min, 0.7);
        assert_eq!(config.detector.aspect_max, 1.3);
        assert_eq!(config.remover.bg_tolerance, 60);
        assert_eq!(config.remover.strategy, RemovalStrategy::Global);
        assert_eq!(config.extractor.small_output, 86);
        assert_eq!(config.extractor.large_output, 157);
        assert_eq!(config.detector.crop_margin, 4);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_overrides_only_named_values() {
        let config = Config::from_toml_str(
            r#"
            parallel = false

            [detector]
            min_area = 1500
            size_split = { area = 9000 }

            [remover]
            strategy = "flood_fill"
            "#,
        )
        .unwrap();
        assert!(!config.parallel);
        assert_eq!(config.detector.min_area, 1500);
        assert_eq!(config.detector.max_area, 50000);
        assert_eq!(config.detector.size_split, SizeSplit::Area(9000));
        assert_eq!(config.remover.strategy, RemovalStrategy::FloodFill);
        assert_eq!(config.remover.bg_tolerance, 60);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[detector]\nmin_aera = 5\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }

    #[test]
    fn inverted_area_range_is_rejected() {
        let err = Config::from_toml_str("[detector]\nmin_area = 9000\nmax_area = 10\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert!(err.message.contains("min_area"));
    }

    #[test]
    fn huge_crop_margin_is_rejected() {
        let err = Config::from_toml_str("[detector]\ncrop_margin = 4294967295\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert!(err.message.contains("crop_margin"));
        Config::from_toml_str(&format!("[detector]\ncrop_margin = {MAX_CROP_MARGIN}\n")).unwrap();
    }

    #[test]
    fn zero_border_width_is_rejected() {
        let mut config = Config::default();
        config.remover.border_sample_width = 0;
        assert!(config.validate().is_err());
    }
}
