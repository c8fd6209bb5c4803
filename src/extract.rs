//! Cuts the reference icon shape out of a square candidate crop.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::config::ExtractorConfig;
use crate::error::{ErrorKind, IconError};
use crate::geometry::SizeClass;
use crate::icon_err;
use crate::mask::Mask;

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Side of the final icon for the given size class
    pub fn output_side(&self, size_class: SizeClass) -> u32 {
        match size_class {
            SizeClass::Small => self.config.small_output,
            SizeClass::Large => self.config.large_output,
        }
    }

    /// Produces an RGBA icon of exactly [`Extractor::output_side`] pixels square.
    ///
    /// Pixels outside the mask get alpha 0, pixels inside keep both their color and
    /// whatever alpha the candidate already had. Colors outside the mask are not cleared.
    pub fn extract(
        &self,
        candidate: &DynamicImage,
        size_class: SizeClass,
        mask: &Mask,
    ) -> Result<RgbaImage, IconError> {
        let mask_side = mask.side();
        let side = candidate.width().min(candidate.height());
        if side < mask_side {
            return Err(icon_err!(
                ErrorKind::UndersizedCandidate,
                "{}x{} candidate is smaller than the {}x{} {size_class} mask",
                candidate.width(),
                candidate.height(),
                mask_side,
                mask_side
            ));
        }

        // detector crops are already square, other callers may pass anything
        let square = candidate
            .crop_imm(
                (candidate.width() - side) / 2,
                (candidate.height() - side) / 2,
                side,
                side,
            )
            .to_rgba8();

        let mut shape = if side == mask_side {
            square
        } else {
            // Triangle widens with the scale factor on downscaling,
            // so every source pixel contributes to the result
            imageops::resize(&square, mask_side, mask_side, FilterType::Triangle)
        };
        apply_mask(&mut shape, mask);

        Ok(upscale(&shape, self.output_side(size_class)))
    }
}

/// Combines the mask with any alpha the image already has; the more transparent value wins
fn apply_mask(image: &mut RgbaImage, mask: &Mask) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if !mask.is_inside(x, y) {
            pixel[3] = 0;
        }
    }
}

/// Smooth scaling for color and nearest-neighbor scaling for alpha,
/// so that the silhouette edge stays crisp without a semi-transparent fringe.
fn upscale(image: &RgbaImage, side: u32) -> RgbaImage {
    if image.width() == side && image.height() == side {
        return image.clone();
    }
    let alpha = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y)[3]])
    });
    let alpha = imageops::resize(&alpha, side, side, FilterType::Nearest);

    let mut opaque = image.clone();
    for pixel in opaque.pixels_mut() {
        // hidden colors still feed the filter at the silhouette edge,
        // which is better than blending towards black
        pixel[3] = u8::MAX;
    }
    let mut result = imageops::resize(&opaque, side, side, FilterType::CatmullRom);
    for (pixel, a) in result.pixels_mut().zip(alpha.pixels()) {
        pixel[3] = a[0];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::MaskSet;
    use image::{Rgba, RgbImage};
    use parameterized::parameterized;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200])))
    }

    #[parameterized(
        input = { (69, 69), (86, 86), (152, 152), (300, 200), (124, 124), (180, 130), (500, 500) },
        size_class = {
            SizeClass::Small, SizeClass::Small, SizeClass::Small, SizeClass::Small,
            SizeClass::Large, SizeClass::Large, SizeClass::Large
        },
        expected = { 86, 86, 86, 86, 157, 157, 157 }
    )]
    fn output_has_canonical_size(input: (u32, u32), size_class: SizeClass, expected: u32) {
        let masks = MaskSet::rounded();
        let icon = Extractor::default()
            .extract(&solid(input.0, input.1), size_class, masks.for_class(size_class))
            .unwrap();
        assert_eq!(icon.dimensions(), (expected, expected));
    }

    #[test]
    fn undersized_candidate_is_reported() {
        let masks = MaskSet::rounded();
        let err = Extractor::default()
            .extract(&solid(120, 200), SizeClass::Large, masks.for_class(SizeClass::Large))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndersizedCandidate);
        assert!(!err.is_fatal());
    }

    #[test]
    fn outside_of_mask_is_transparent_and_inside_keeps_color() {
        let masks = MaskSet::rounded();
        let icon = Extractor::default()
            .extract(&solid(69, 69), SizeClass::Small, masks.for_class(SizeClass::Small))
            .unwrap();
        assert_eq!(icon.get_pixel(0, 0)[3], 0);
        assert_eq!(icon.get_pixel(85, 85)[3], 0);
        assert_eq!(*icon.get_pixel(43, 43), Rgba([30, 120, 200, 255]));
    }

    #[test]
    fn alpha_is_never_semi_transparent() {
        let masks = MaskSet::rounded();
        let icon = Extractor::default()
            .extract(&solid(200, 200), SizeClass::Large, masks.for_class(SizeClass::Large))
            .unwrap();
        assert!(icon.pixels().all(|p| p[3] == 0 || p[3] == 255));
    }

    #[test]
    fn existing_transparency_survives_masking() {
        let mut candidate = RgbaImage::from_pixel(69, 69, Rgba([200, 10, 10, 255]));
        candidate.put_pixel(34, 34, Rgba([200, 10, 10, 0]));
        let mask = Mask::rounded_square(69, 0);
        let extractor = Extractor::new(ExtractorConfig {
            small_output: 69,
            large_output: 124,
        });
        let icon = extractor
            .extract(&DynamicImage::ImageRgba8(candidate), SizeClass::Small, &mask)
            .unwrap();
        assert_eq!(icon.get_pixel(34, 34)[3], 0);
        assert_eq!(icon.get_pixel(33, 34)[3], 255);
    }
}
