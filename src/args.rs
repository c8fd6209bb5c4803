//! Command-line arguments of both binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, RemovalStrategy};
use crate::error::IconError;
use crate::help::{extract_after_help, mask_after_help, version_string};
use crate::mask::DEFAULT_THRESHOLD;

/// Cut app icons with transparent backgrounds out of a home-screen screenshot
#[derive(Parser, Debug, Clone)]
#[command(
    name = "iconsnip-extract",
    version = version_string(),
    long_about = None,
    after_help = extract_after_help(),
    arg_required_else_help = true
)]
pub struct ExtractArgs {
    /// Screenshot to process
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub screenshot: PathBuf,

    /// Directory for the finished icons
    #[arg(short, long, default_value = "new_icons", value_hint = clap::ValueHint::DirPath)]
    pub out: PathBuf,

    /// Reference mask for small icons
    #[arg(long, default_value = "masks/iconmask_small.png", value_hint = clap::ValueHint::FilePath)]
    pub small_mask: PathBuf,

    /// Reference mask for large icons
    #[arg(long, default_value = "masks/iconmask_big.png", value_hint = clap::ValueHint::FilePath)]
    pub large_mask: PathBuf,

    /// TOML file with threshold overrides
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Replacement icon background; each icon is also written on top of it
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub background: Option<PathBuf>,

    /// Also write raw crops, masked shapes, a detection overlay and a preview grid here
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub debug_dir: Option<PathBuf>,

    /// Smallest icon bounding-box area in pixels
    #[arg(long)]
    pub min_area: Option<u32>,

    /// Largest icon bounding-box area in pixels
    #[arg(long)]
    pub max_area: Option<u32>,

    /// Drop boxes overlapping a bigger one by more than this IoU
    #[arg(long)]
    pub overlap_threshold: Option<f64>,

    /// Per-channel distance from the background color that still counts as background
    #[arg(long)]
    pub bg_tolerance: Option<u8>,

    /// Width of the icon border sampled for the background color
    #[arg(long)]
    pub border_sample_width: Option<u32>,

    /// Only clear background connected to the icon border
    #[arg(long)]
    pub flood_fill: bool,

    /// Process icons one after another instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Print per-icon details
    #[arg(short, long)]
    pub verbose: bool,
}

impl ExtractArgs {
    /// Defaults, then the config file, then flags
    pub fn config(&self) -> Result<Config, IconError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut Config) {
        let detector = &mut config.detector;
        if let Some(v) = self.min_area {
            detector.min_area = v;
        }
        if let Some(v) = self.max_area {
            detector.max_area = v;
        }
        if let Some(v) = self.overlap_threshold {
            detector.overlap_threshold = v;
        }
        let remover = &mut config.remover;
        if let Some(v) = self.bg_tolerance {
            remover.bg_tolerance = v;
        }
        if let Some(v) = self.border_sample_width {
            remover.border_sample_width = v;
        }
        if self.flood_fill {
            remover.strategy = RemovalStrategy::FloodFill;
        }
        if self.sequential {
            config.parallel = false;
        }
    }
}

/// Build the small and large reference masks from one drawing of the icon shape
#[derive(Parser, Debug, Clone)]
#[command(
    name = "iconsnip-mask",
    version = version_string(),
    long_about = None,
    after_help = mask_after_help(),
    arg_required_else_help = true
)]
pub struct MaskArgs {
    /// Image of the icon silhouette
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub shape: PathBuf,

    /// Directory for the generated masks
    #[arg(short, long, default_value = "masks", value_hint = clap::ValueHint::DirPath)]
    pub out: PathBuf,

    /// Brightness or alpha above which a pixel is inside the shape
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u8,

    /// Print details
    #[arg(short, long)]
    pub verbose: bool,
}
