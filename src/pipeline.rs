//! Runs the three stages over one screenshot.
//!
//! [`Pipeline::run`] works purely in memory and is what the tests exercise.
//! [`Pipeline::execute`] wraps it with decoding, output files and the optional
//! diagnostic images. With a backdrop, every icon is also composed onto it.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rayon::prelude::*;

use crate::background::{BackgroundRemover, RemovalOutcome};
use crate::compose::Backdrop;
use crate::config::Config;
use crate::decode::decode;
use crate::detect::{suggested_area_range, Candidate, Detector};
use crate::encode::{ensure_dir, write_png};
use crate::error::{ErrorKind, IconError};
use crate::extract::Extractor;
use crate::mask::MaskSet;
use crate::utils::filename::{composed_file_name, icon_file_name, stage_file_name};
use crate::{debug, log, warn};

const OVERLAY_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const OVERLAY_THICKNESS: u32 = 2;
/// Size of one dot of the index labels
const LABEL_SCALE: u32 = 3;

const PREVIEW_CELL: u32 = 120;
const PREVIEW_PADDING: u32 = 5;
const PREVIEW_COLUMNS: usize = 6;
const PREVIEW_BACKGROUND: Rgba<u8> = Rgba([64, 64, 64, 255]);

/// 3x5 digits, one row per byte, most significant of the three bits on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Everything produced for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedIcon {
    /// 1-based position in reading order
    pub index: usize,
    pub candidate: Candidate,
    /// Square cut out of the screenshot
    pub crop: DynamicImage,
    /// Icon after masking, background still in place
    pub shape: RgbaImage,
    /// Final icon
    pub icon: RgbaImage,
    pub background: RemovalOutcome,
    /// Final icon on the replacement background, if one was given
    pub composed: Option<RgbaImage>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub icons: Vec<ProcessedIcon>,
    /// Candidates that could not be extracted, by their 1-based index
    pub skipped: Vec<(usize, IconError)>,
    /// Icons kept as extracted because no background color was found
    pub backgrounds_missing: usize,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    detector: Detector,
    extractor: Extractor,
    remover: BackgroundRemover,
    masks: MaskSet,
    backdrop: Option<Backdrop>,
    parallel: bool,
}

impl Pipeline {
    pub fn new(config: Config, masks: MaskSet) -> Self {
        Self {
            detector: Detector::new(config.detector),
            extractor: Extractor::new(config.extractor),
            remover: BackgroundRemover::new(config.remover),
            masks,
            backdrop: None,
            parallel: config.parallel,
        }
    }

    /// Also put every icon on `image`, cut to the reference mask of its size class
    pub fn with_backdrop(mut self, image: &DynamicImage) -> Self {
        self.backdrop = Some(Backdrop::new(image, &self.masks, &self.extractor));
        self
    }

    pub fn load_backdrop(self, path: &Path) -> Result<Self, IconError> {
        let image = decode(path, ErrorKind::InvalidInput)?;
        debug!("compose"; "backdrop {} ({}x{})", path.display(), image.width(), image.height());
        Ok(self.with_backdrop(&image))
    }

    pub fn run(&self, screenshot: &DynamicImage) -> Result<RunReport, IconError> {
        let candidates = self.detector.detect(screenshot)?;
        debug!("detect"; "{} candidates", candidates.len());

        let process = |(i, candidate): (usize, &Candidate)| {
            (i + 1, self.process(screenshot, i + 1, candidate))
        };
        // collecting keeps reading order regardless of which thread finished first
        let results: Vec<_> = if self.parallel {
            candidates.par_iter().enumerate().map(process).collect()
        } else {
            candidates.iter().enumerate().map(process).collect()
        };

        let mut report = RunReport::default();
        for (index, result) in results {
            match result {
                Ok(icon) => {
                    if icon.background == RemovalOutcome::BackgroundNotDetected {
                        report.backgrounds_missing += 1;
                    }
                    report.icons.push(icon);
                }
                Err(e) if !e.is_fatal() => {
                    warn!("extract"; "skipping candidate {index}: {e}");
                    report.skipped.push((index, e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    fn process(
        &self,
        screenshot: &DynamicImage,
        index: usize,
        candidate: &Candidate,
    ) -> Result<ProcessedIcon, IconError> {
        let c = candidate.crop;
        let crop = screenshot.crop_imm(c.x, c.y, c.width, c.height);
        let shape = self.extractor.extract(
            &crop,
            candidate.size_class,
            self.masks.for_class(candidate.size_class),
        )?;

        // sampled at screen resolution, the scaled icon blurs its edge into the ring
        let mut icon = shape.clone();
        let background = match self.remover.estimate_background(&crop.to_rgba8()) {
            Some(color) => self.remover.clear(&mut icon, color),
            None => RemovalOutcome::BackgroundNotDetected,
        };
        match background {
            RemovalOutcome::Removed {
                background,
                cleared,
            } => {
                debug!("remove"; "icon {index}: background {:?}, {cleared} pixels cleared", background.0);
            }
            RemovalOutcome::BackgroundNotDetected => {
                warn!("remove"; "icon {index}: no background color found, keeping it as extracted");
            }
        }

        let composed = self
            .backdrop
            .as_ref()
            .map(|backdrop| backdrop.compose(&icon, candidate.size_class));

        Ok(ProcessedIcon {
            index,
            candidate: *candidate,
            crop,
            shape,
            icon,
            background,
            composed,
        })
    }

    /// Processes a screenshot file and writes one PNG per icon into `out_dir`,
    /// plus a `_composed` PNG per icon when a backdrop is set.
    /// With `debug_dir`, the raw crops, the masked shapes, an overlay of the
    /// detections and a before/after preview are written there as well.
    pub fn execute(
        &self,
        screenshot_path: &Path,
        out_dir: &Path,
        debug_dir: Option<&Path>,
    ) -> Result<RunReport, IconError> {
        let screenshot = decode(screenshot_path, ErrorKind::InvalidInput)?;
        log!("detect"; "{} ({}x{})", screenshot_path.display(), screenshot.width(), screenshot.height());

        let report = self.run(&screenshot)?;
        if report.icons.is_empty() && report.skipped.is_empty() {
            let (min, max) = suggested_area_range(screenshot.width(), screenshot.height());
            log!("detect"; "no icons found, try --min-area {min} --max-area {max} for this resolution");
        }

        ensure_dir(out_dir)?;
        for icon in &report.icons {
            let name = icon_file_name(icon.index, icon.candidate.size_class, icon.icon.width());
            write_png(&DynamicImage::ImageRgba8(icon.icon.clone()), &out_dir.join(name))?;
            if let Some(composed) = &icon.composed {
                let name = composed_file_name(icon.index, icon.candidate.size_class, composed.width());
                write_png(&DynamicImage::ImageRgba8(composed.clone()), &out_dir.join(name))?;
            }
        }
        if let Some(debug_dir) = debug_dir {
            write_diagnostics(&screenshot, &report, debug_dir)?;
        }

        log!(
            "done";
            "{} icons written to {} ({} skipped, {} without a detectable background)",
            report.icons.len(),
            out_dir.display(),
            report.skipped.len(),
            report.backgrounds_missing
        );
        Ok(report)
    }
}

fn write_diagnostics(
    screenshot: &DynamicImage,
    report: &RunReport,
    debug_dir: &Path,
) -> Result<(), IconError> {
    let detected = debug_dir.join("detected");
    let shapes = debug_dir.join("shapes");
    ensure_dir(&detected)?;
    ensure_dir(&shapes)?;

    for icon in &report.icons {
        let name = stage_file_name(icon.index, icon.candidate.size_class);
        // float screenshots have no PNG equivalent
        write_png(&DynamicImage::ImageRgba8(icon.crop.to_rgba8()), &detected.join(&name))?;
        write_png(&DynamicImage::ImageRgba8(icon.shape.clone()), &shapes.join(&name))?;
    }

    let overlay = draw_detections(
        screenshot,
        report.icons.iter().map(|icon| (icon.index, &icon.candidate)),
    );
    write_png(
        &DynamicImage::ImageRgba8(overlay),
        &debug_dir.join("detected_icons_visualization.png"),
    )?;
    write_png(
        &DynamicImage::ImageRgba8(preview_grid(&report.icons)),
        &debug_dir.join("extraction_preview.png"),
    )?;
    debug!("done"; "diagnostics written to {}", debug_dir.display());
    Ok(())
}

/// Screenshot with a rectangle around every crop, labelled with the icon's index
pub fn draw_detections<'a>(
    screenshot: &DynamicImage,
    candidates: impl IntoIterator<Item = (usize, &'a Candidate)>,
) -> RgbaImage {
    let mut canvas = screenshot.to_rgba8();
    for (index, candidate) in candidates {
        let b = candidate.crop;
        for inset in 0..OVERLAY_THICKNESS.min(b.width / 2).min(b.height / 2) {
            let rect = Rect::at((b.x + inset) as i32, (b.y + inset) as i32)
                .of_size(b.width - 2 * inset, b.height - 2 * inset);
            draw_hollow_rect_mut(&mut canvas, rect, OVERLAY_COLOR);
        }
        draw_label(&mut canvas, b.x, b.y, index);
    }
    canvas
}

/// Writes `index` just above `(x, y)`, or at the top edge if there is no room
fn draw_label(canvas: &mut RgbaImage, x: u32, y: u32, index: usize) {
    let top = y.saturating_sub(5 * LABEL_SCALE + 2);
    let digits = index.to_string().chars().filter_map(|c| c.to_digit(10)).collect::<Vec<_>>();
    for (position, digit) in digits.into_iter().enumerate() {
        let left = x + position as u32 * 4 * LABEL_SCALE;
        for (row, &bits) in DIGITS[digit as usize].iter().enumerate() {
            for column in 0..3 {
                if (bits >> (2 - column)) & 1 == 1 {
                    let rect = Rect::at(
                        (left + column * LABEL_SCALE) as i32,
                        (top + row as u32 * LABEL_SCALE) as i32,
                    )
                    .of_size(LABEL_SCALE, LABEL_SCALE);
                    draw_filled_rect_mut(canvas, rect, OVERLAY_COLOR);
                }
            }
        }
    }
}

/// Before/after grid of the first few icons: the raw crops on top,
/// the finished icons below them on a dark background
pub fn preview_grid(icons: &[ProcessedIcon]) -> RgbaImage {
    let shown = &icons[..icons.len().min(PREVIEW_COLUMNS)];
    let width = PREVIEW_CELL * shown.len().max(1) as u32;
    let mut grid = RgbaImage::from_pixel(width, 2 * PREVIEW_CELL, PREVIEW_BACKGROUND);
    let inner = PREVIEW_CELL - 2 * PREVIEW_PADDING;
    for (column, icon) in shown.iter().enumerate() {
        let x = i64::from(column as u32 * PREVIEW_CELL + PREVIEW_PADDING);
        let before = imageops::resize(&icon.crop.to_rgba8(), inner, inner, FilterType::Triangle);
        let after = icon.composed.as_ref().unwrap_or(&icon.icon);
        let after = imageops::resize(after, inner, inner, FilterType::Triangle);
        imageops::overlay(&mut grid, &before, x, i64::from(PREVIEW_PADDING));
        imageops::overlay(&mut grid, &after, x, i64::from(PREVIEW_CELL + PREVIEW_PADDING));
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::within_tolerance;
    use crate::geometry::{BoundingBox, SizeClass};
    use crate::mask::{Mask, LARGE_MASK_SIDE, SMALL_MASK_SIDE};
    use image::{Rgb, RgbImage};

    const SCREEN: Rgb<u8> = Rgb([20, 20, 30]);
    const PLATE: Rgb<u8> = Rgb([230, 230, 230]);
    const GLYPH: Rgb<u8> = Rgb([200, 30, 30]);
    const ICON_XS: [u32; 3] = [100, 400, 700];

    /// Three 120px icons in a row: a light plate with a red square in the middle
    fn screenshot() -> DynamicImage {
        let mut image = RgbImage::from_pixel(1080, 800, SCREEN);
        for x0 in ICON_XS {
            let y0 = 200;
            for y in y0..y0 + 120 {
                for x in x0..x0 + 120 {
                    let in_glyph = (x0 + 30..x0 + 90).contains(&x) && (y0 + 30..y0 + 90).contains(&y);
                    image.put_pixel(x, y, if in_glyph { GLYPH } else { PLATE });
                }
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    fn pipeline(parallel: bool) -> Pipeline {
        let config = Config {
            parallel,
            ..Default::default()
        };
        Pipeline::new(config, MaskSet::rounded())
    }

    fn square_masks() -> MaskSet {
        MaskSet {
            small: Mask::rounded_square(SMALL_MASK_SIDE, 0),
            large: Mask::rounded_square(LARGE_MASK_SIDE, 0),
        }
    }

    #[test]
    fn every_icon_is_extracted_in_reading_order() {
        let report = pipeline(true).run(&screenshot()).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.icons.len(), 3);
        for (i, icon) in report.icons.iter().enumerate() {
            assert_eq!(icon.index, i + 1);
            assert_eq!(icon.candidate.size_class, SizeClass::Small);
            assert_eq!(icon.icon.dimensions(), (86, 86));
            assert!(matches!(
                icon.background,
                RemovalOutcome::Removed { background: SCREEN, .. }
            ));
            // masked corner, screen margin, plate and glyph
            assert_eq!(icon.icon.get_pixel(0, 0)[3], 0);
            assert_eq!(icon.icon.get_pixel(43, 0)[3], 0);
            assert_eq!(icon.icon.get_pixel(43, 12)[3], 255);
            assert_eq!(*icon.icon.get_pixel(43, 43), Rgba([200, 30, 30, 255]));
            assert!(icon.composed.is_none());
        }
        let xs: Vec<u32> = report.icons.iter().map(|i| i.candidate.bounds.x).collect();
        assert!(xs.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn solid_icon_round_trips_at_default_sizes() {
        let screen = Rgb([30, 30, 40]);
        let color = Rgb([240, 180, 20]);
        let mut image = RgbImage::from_pixel(400, 300, screen);
        for y in 100..200 {
            for x in 150..250 {
                image.put_pixel(x, y, color);
            }
        }
        let report = Pipeline::new(Config::default(), square_masks())
            .run(&DynamicImage::ImageRgb8(image))
            .unwrap();
        assert_eq!(report.icons.len(), 1);
        let icon = &report.icons[0];
        // the traced box is one pixel wider than the icon on every side, plus the margin
        assert_eq!(icon.candidate.crop, BoundingBox::new(145, 95, 110, 110));
        assert!(matches!(
            icon.background,
            RemovalOutcome::Removed { background, .. } if background == screen
        ));
        assert_eq!(icon.icon.dimensions(), (86, 86));

        let mut transparent = 0i64;
        for (x, y, pixel) in icon.icon.enumerate_pixels() {
            let rgb = Rgb([pixel[0], pixel[1], pixel[2]]);
            if pixel[3] == 0 {
                transparent += 1;
            } else {
                assert!(!within_tolerance(rgb, screen, 60), "screen color left at {x},{y}");
            }
            if (8..78).contains(&x) && (8..78).contains(&y) {
                assert_eq!(*pixel, Rgba([240, 180, 20, 255]), "at {x},{y}");
            }
        }
        // background share of the crop, give or take the one-pixel resampling seam
        let expected = 86 * 86 - (86 * 100 / 110) * (86 * 100 / 110);
        assert!((transparent - expected).abs() <= 4 * 86, "{transparent} vs {expected}");
    }

    #[test]
    fn backdrop_shows_where_the_background_was_removed() {
        let autumn = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb([200, 110, 40])));
        let report = pipeline(false).with_backdrop(&autumn).run(&screenshot()).unwrap();
        for icon in &report.icons {
            let composed = icon.composed.as_ref().unwrap();
            assert_eq!(composed.dimensions(), icon.icon.dimensions());
            assert_eq!(composed.get_pixel(0, 0)[3], 0);
            assert_eq!(*composed.get_pixel(43, 0), Rgba([200, 110, 40, 255]));
            assert_eq!(*composed.get_pixel(43, 43), Rgba([200, 30, 30, 255]));
        }
    }

    #[test]
    fn unreadable_backdrop_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(true)
            .load_backdrop(&dir.path().join("autumn_bg.png"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn preview_grid_shows_crops_above_icons() {
        let report = pipeline(true).run(&screenshot()).unwrap();
        let grid = preview_grid(&report.icons);
        assert_eq!(grid.dimensions(), (3 * PREVIEW_CELL, 2 * PREVIEW_CELL));
        assert_eq!(*grid.get_pixel(1, 1), PREVIEW_BACKGROUND);
        // centers of the first crop and the first finished icon are both glyph
        let is_glyph = |p: &Rgba<u8>| p.0.iter().zip([200, 30, 30, 255]).all(|(&a, b)| a.abs_diff(b) <= 1);
        assert!(is_glyph(grid.get_pixel(PREVIEW_CELL / 2, PREVIEW_CELL / 2)));
        assert!(is_glyph(grid.get_pixel(PREVIEW_CELL / 2, PREVIEW_CELL + PREVIEW_CELL / 2)));
        assert_eq!(preview_grid(&[]).dimensions(), (PREVIEW_CELL, 2 * PREVIEW_CELL));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let shot = screenshot();
        let parallel = pipeline(true).run(&shot).unwrap();
        let sequential = pipeline(false).run(&shot).unwrap();
        assert_eq!(parallel.icons, sequential.icons);
    }

    #[test]
    fn undersized_candidates_are_skipped_not_fatal() {
        let masks = MaskSet {
            small: Mask::rounded_square(200, 0),
            large: Mask::rounded_square(200, 0),
        };
        let report = Pipeline::new(Config::default(), masks)
            .run(&screenshot())
            .unwrap();
        assert!(report.icons.is_empty());
        let indices: Vec<usize> = report.skipped.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(report
            .skipped
            .iter()
            .all(|(_, e)| e.kind == ErrorKind::UndersizedCandidate));
    }

    #[test]
    fn blank_screenshot_gives_an_empty_report() {
        let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 400, SCREEN));
        let report = pipeline(true).run(&blank).unwrap();
        assert!(report.icons.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn empty_screenshot_is_fatal() {
        let err = pipeline(true).run(&DynamicImage::new_rgb8(0, 0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn execute_writes_icons_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("home.png");
        write_png(&screenshot(), &input).unwrap();
        let out = dir.path().join("out");
        let debug = dir.path().join("debug");

        let report = pipeline(true).execute(&input, &out, Some(&debug)).unwrap();
        assert_eq!(report.icons.len(), 3);
        for index in 1..=3 {
            assert!(out.join(icon_file_name(index, SizeClass::Small, 86)).is_file());
            let stage = stage_file_name(index, SizeClass::Small);
            assert!(debug.join("detected").join(&stage).is_file());
            assert!(debug.join("shapes").join(&stage).is_file());
        }
        assert!(debug.join("extraction_preview.png").is_file());
        let overlay = image::open(debug.join("detected_icons_visualization.png"))
            .unwrap()
            .to_rgba8();
        let crop = report.icons[0].candidate.crop;
        assert_eq!(*overlay.get_pixel(crop.x, crop.y), OVERLAY_COLOR);
        // the "1" label above the box: middle dot of the top row is lit, its neighbours are not
        let top = crop.y - 5 * LABEL_SCALE - 2;
        assert_eq!(*overlay.get_pixel(crop.x + LABEL_SCALE + 1, top + 1), OVERLAY_COLOR);
        assert_eq!(*overlay.get_pixel(crop.x + 1, top + 1), Rgba([20, 20, 30, 255]));
    }

    #[test]
    fn labels_count_past_nine() {
        let mut canvas = RgbaImage::from_pixel(60, 40, Rgba([0, 0, 0, 255]));
        draw_label(&mut canvas, 10, 30, 10);
        let top = 30 - 5 * LABEL_SCALE - 2;
        // "1" then "0": the second digit starts four dots to the right and has a full top row
        assert_eq!(*canvas.get_pixel(10, top), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(10 + 4 * LABEL_SCALE, top), OVERLAY_COLOR);
        // too close to the top edge, the label is clamped inside
        draw_label(&mut canvas, 40, 0, 7);
        assert_eq!(*canvas.get_pixel(40, 0), OVERLAY_COLOR);
    }

    #[test]
    fn missing_screenshot_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(true)
            .execute(&dir.path().join("nope.png"), &dir.path().join("out"), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
