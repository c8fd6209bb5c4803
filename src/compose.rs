//! Puts extracted icons on a replacement icon background.
//!
//! The backdrop image is scaled to each output size and cut to the reference mask.
//! An icon with its background removed is then alpha-blended on top, so its artwork
//! ends up on the new backdrop with the same silhouette as before.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::extract::Extractor;
use crate::geometry::SizeClass;
use crate::mask::{Mask, MaskSet};

/// Replacement background, prepared once per size class.
#[derive(Debug, Clone, PartialEq)]
pub struct Backdrop {
    small: RgbaImage,
    large: RgbaImage,
}

impl Backdrop {
    pub fn new(image: &DynamicImage, masks: &MaskSet, extractor: &Extractor) -> Self {
        let prepare = |class: SizeClass| {
            cut_to_mask(image, masks.for_class(class), extractor.output_side(class))
        };
        Self {
            small: prepare(SizeClass::Small),
            large: prepare(SizeClass::Large),
        }
    }

    pub fn for_class(&self, size_class: SizeClass) -> &RgbaImage {
        match size_class {
            SizeClass::Small => &self.small,
            SizeClass::Large => &self.large,
        }
    }

    /// The icon blended over the backdrop of its size class
    pub fn compose(&self, icon: &RgbaImage, size_class: SizeClass) -> RgbaImage {
        blend_over(self.for_class(size_class), icon)
    }
}

/// Scales `image` to `side` x `side` and makes everything outside the mask transparent
fn cut_to_mask(image: &DynamicImage, mask: &Mask, side: u32) -> RgbaImage {
    let mut scaled = imageops::resize(&image.to_rgba8(), side, side, FilterType::Triangle);
    let mask = mask.resized(side);
    for (x, y, pixel) in scaled.enumerate_pixels_mut() {
        if !mask.is_inside(x, y) {
            pixel[3] = 0;
        }
    }
    scaled
}

/// Color is mixed by the alpha of `top`; the result keeps the more opaque of the two alphas.
/// Pixels of `top` outside `bottom` are ignored.
pub fn blend_over(bottom: &RgbaImage, top: &RgbaImage) -> RgbaImage {
    let mut result = bottom.clone();
    for (x, y, pixel) in result.enumerate_pixels_mut() {
        let Some(&Rgba([r, g, b, a])) = top.get_pixel_checked(x, y) else {
            continue;
        };
        let weight = f32::from(a) / 255.0;
        for (channel, value) in pixel.0.iter_mut().zip([r, g, b]) {
            let mixed = weight * f32::from(value) + (1.0 - weight) * f32::from(*channel);
            *channel = mixed.round().clamp(0.0, 255.0) as u8;
        }
        pixel[3] = pixel[3].max(a);
    }
    result
}
