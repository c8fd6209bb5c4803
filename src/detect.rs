//! Finds icon-shaped regions in a screenshot.
//!
//! The screenshot is reduced to a binary edge map (Sobel gradient magnitude above a
//! threshold, with small gaps closed), the outermost contours of that map are traced,
//! and their bounding boxes are filtered by area and aspect ratio. Duplicate
//! detections of the same icon are suppressed greedily, biggest box first.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;

use crate::config::{DetectorConfig, SizeSplit};
use crate::decode::ensure_not_empty;
use crate::error::{ErrorKind, IconError};
use crate::geometry::{sort_reading_order, BoundingBox, SizeClass};
use crate::debug;

/// Boxes must be at least this much bigger than the next smaller one
/// before [`SizeSplit::Auto`] puts them in the large class.
const AUTO_SPLIT_MIN_RATIO: f64 = 1.5;

const EDGE: Luma<u8> = Luma([255]);

/// One likely icon location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Bounding box of the traced contour
    pub bounds: BoundingBox,
    /// Square region to cut out of the screenshot, always inside the image
    pub crop: BoundingBox,
    pub size_class: SizeClass,
}

/// Candidates of one screenshot in reading order. No two `bounds` overlap by more
/// than the configured IoU threshold.
pub type CandidateSet = Vec<Candidate>;

#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// An empty result is not an error; it is up to the caller to decide what it means.
    pub fn detect(&self, screenshot: &DynamicImage) -> Result<CandidateSet, IconError> {
        ensure_not_empty(screenshot, ErrorKind::InvalidInput)?;
        let (width, height) = (screenshot.width(), screenshot.height());

        let edges = self.edge_map(&screenshot.to_luma8());
        let boxes = self.contour_boxes(&edges);
        debug!("detect"; "{} contours passed the shape filters", boxes.len());

        let boxes = remove_overlaps(boxes, self.config.overlap_threshold);
        debug!("detect"; "{} boxes left after overlap removal", boxes.len());

        let split = split_area(&boxes, self.config.size_split);
        let mut candidates: CandidateSet = boxes
            .into_iter()
            .filter_map(|bounds| {
                let square = bounds.centered_square();
                let inside = square.inside_fraction(width, height);
                if inside < self.config.min_inside_fraction {
                    debug!("detect"; "dropping {bounds}: only {:.0}% inside the screenshot", inside * 100.0);
                    return None;
                }
                let size_class = match split {
                    Some(threshold) if bounds.area() > threshold => SizeClass::Large,
                    _ => SizeClass::Small,
                };
                Some(Candidate {
                    bounds,
                    crop: square
                        .padded(self.config.crop_margin)
                        .shift_inside(width, height),
                    size_class,
                })
            })
            .collect();

        sort_reading_order(&mut candidates, |c| c.bounds);
        Ok(candidates)
    }

    /// Binary map with 255 wherever the gradient magnitude reaches the edge threshold
    pub fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let gradients = imageproc::gradients::sobel_gradients(gray);
        let threshold = self.config.edge_threshold;
        let mut edges = GrayImage::new(gray.width(), gray.height());
        for (x, y, magnitude) in gradients.enumerate_pixels() {
            if magnitude[0] >= threshold {
                edges.put_pixel(x, y, EDGE);
            }
        }
        // bridge one-pixel breaks in the outline, e.g. from JPEG artifacts
        imageproc::morphology::close(&edges, Norm::LInf, 1)
    }

    /// Bounding boxes of the outermost contours that look like icons
    fn contour_boxes(&self, edges: &GrayImage) -> Vec<BoundingBox> {
        find_contours::<i32>(edges)
            .into_iter()
            // icon artwork produces contours nested inside the icon outline, skip them
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .filter_map(|contour| {
                BoundingBox::enclosing(
                    contour
                        .points
                        .iter()
                        .map(|p| (p.x.max(0) as u32, p.y.max(0) as u32)),
                )
            })
            .filter(|b| self.accepts(b))
            .collect()
    }

    /// Area, aspect ratio and minimum side filters
    pub fn accepts(&self, b: &BoundingBox) -> bool {
        let c = &self.config;
        let area = b.area();
        let aspect = b.aspect_ratio();
        area >= u64::from(c.min_area)
            && area <= u64::from(c.max_area)
            && aspect >= c.aspect_min
            && aspect <= c.aspect_max
            && b.width > c.min_side
            && b.height > c.min_side
    }
}

/// Greedy duplicate suppression: boxes are visited from the largest area down,
/// and a box is kept only if its IoU with every box kept so far is at most `threshold`.
pub fn remove_overlaps(mut boxes: Vec<BoundingBox>, threshold: f64) -> Vec<BoundingBox> {
    // position breaks ties so that the result does not depend on contour tracing order
    boxes.sort_by(|a, b| {
        b.area()
            .cmp(&a.area())
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for b in boxes {
        if kept.iter().all(|k| k.iou(&b) <= threshold) {
            kept.push(b);
        }
    }
    kept
}

/// Area above which a box is large, or `None` if every box is small
fn split_area(boxes: &[BoundingBox], split: SizeSplit) -> Option<u64> {
    match split {
        SizeSplit::Area(area) => Some(u64::from(area)),
        SizeSplit::Auto => {
            let mut areas: Vec<u64> = boxes.iter().map(|b| b.area()).collect();
            areas.sort_unstable();
            areas
                .windows(2)
                .filter(|pair| pair[0] > 0)
                .map(|pair| (pair[0], pair[1] as f64 / pair[0] as f64))
                .fold(None, |best: Option<(u64, f64)>, (area, ratio)| match best {
                    Some((_, best_ratio)) if best_ratio >= ratio => best,
                    _ => Some((area, ratio)),
                })
                .filter(|&(_, ratio)| ratio >= AUTO_SPLIT_MIN_RATIO)
                .map(|(area, _)| area)
        }
    }
}

/// Area range that usually works for a screenshot of the given resolution
pub fn suggested_area_range(width: u32, height: u32) -> (u32, u32) {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > 2_000_000 {
        (1500, 60000)
    } else if pixels > 1_000_000 {
        (1000, 40000)
    } else {
        (500, 20000)
    }
}
