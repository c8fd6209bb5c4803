//! Reference icon silhouettes, one per size class.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

use crate::decode::decode;
use crate::encode::write_png;
use crate::error::{ErrorKind, IconError};
use crate::geometry::SizeClass;
use crate::icon_err;

pub const SMALL_MASK_SIDE: u32 = 69;
pub const LARGE_MASK_SIDE: u32 = 124;

pub const SMALL_MASK_FILE: &str = "iconmask_small.png";
pub const LARGE_MASK_FILE: &str = "iconmask_big.png";

/// Value threshold shared by mask loading and mask creation
pub const DEFAULT_THRESHOLD: u8 = 127;

const INSIDE: Luma<u8> = Luma([255]);
const OUTSIDE: Luma<u8> = Luma([0]);

/// Square binary image: 255 inside the icon shape, 0 outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    /// Reads a mask from disk. See [`Mask::from_image`] for how pixels are classified.
    pub fn load(path: &Path) -> Result<Self, IconError> {
        let image = decode(path, ErrorKind::MissingMask)?;
        Self::from_image(&image, DEFAULT_THRESHOLD).map_err(|e| IconError {
            message: format!("{} (in '{}')", e.message, path.display()),
            ..e
        })
    }

    /// Images with transparency use the alpha channel to tell inside from outside,
    /// opaque images use brightness. Anything enclosed by the shape counts as inside,
    /// so an outline-only drawing gives the same mask as a filled one.
    pub fn from_image(image: &DynamicImage, threshold: u8) -> Result<Self, IconError> {
        if image.width() != image.height() || image.width() == 0 {
            return Err(icon_err!(
                ErrorKind::MissingMask,
                "mask must be a non-empty square, got {}x{}",
                image.width(),
                image.height()
            ));
        }
        let pixels = binarize(image, threshold);
        let mask = Self {
            pixels: fill_enclosed(pixels),
        };
        if mask.inside_count() == 0 {
            return Err(icon_err!(ErrorKind::MissingMask, "mask has no inside pixels"));
        }
        Ok(mask)
    }

    /// Same shape at a different size, with no intermediate values
    pub fn resized(&self, side: u32) -> Self {
        Self {
            pixels: imageops::resize(&self.pixels, side, side, FilterType::Nearest),
        }
    }

    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    pub fn is_inside(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] != 0
    }

    pub fn inside_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Rounded square covering the whole canvas; for tests that need a realistic mask
    #[cfg(test)]
    pub(crate) fn rounded_square(side: u32, radius: u32) -> Self {
        let pixels = GrayImage::from_fn(side, side, |x, y| {
            let dx = radius.saturating_sub(x).max((x + radius + 1).saturating_sub(side));
            let dy = radius.saturating_sub(y).max((y + radius + 1).saturating_sub(side));
            if dx * dx + dy * dy <= radius * radius {
                INSIDE
            } else {
                OUTSIDE
            }
        });
        Self { pixels }
    }
}

fn binarize(image: &DynamicImage, threshold: u8) -> GrayImage {
    let uses_alpha = image.color().has_alpha() && {
        let rgba = image.to_rgba8();
        rgba.pixels().any(|p| p[3] != u8::MAX)
    };
    if uses_alpha {
        let rgba = image.to_rgba8();
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if rgba.get_pixel(x, y)[3] > threshold {
                INSIDE
            } else {
                OUTSIDE
            }
        })
    } else {
        let mut gray = image.to_luma8();
        for p in gray.pixels_mut() {
            *p = if p[0] > threshold { INSIDE } else { OUTSIDE };
        }
        gray
    }
}

/// Marks every outside pixel that cannot reach the image border as inside
fn fill_enclosed(mut pixels: GrayImage) -> GrayImage {
    let (width, height) = pixels.dimensions();
    let mut reachable = vec![false; width as usize * height as usize];
    let mut queue = VecDeque::new();
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    for y in 0..height {
        for x in 0..width {
            let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            if on_border && pixels.get_pixel(x, y)[0] == 0 {
                reachable[index(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx < width && ny < height && !reachable[index(nx, ny)] && pixels.get_pixel(nx, ny)[0] == 0 {
                reachable[index(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }
    for (x, y, p) in pixels.enumerate_pixels_mut() {
        if !reachable[index(x, y)] {
            *p = INSIDE;
        }
    }
    pixels
}

/// The reference masks for both size classes, shared read-only by all icons.
#[derive(Debug, Clone)]
pub struct MaskSet {
    pub small: Mask,
    pub large: Mask,
}

impl MaskSet {
    pub fn load(small: &Path, large: &Path) -> Result<Self, IconError> {
        Ok(Self {
            small: Mask::load(small)?,
            large: Mask::load(large)?,
        })
    }

    /// Builds both reference masks from a single drawing of the icon shape
    pub fn from_shape_image(shape: &DynamicImage, threshold: u8) -> Result<Self, IconError> {
        // masks are square, so crop the drawing to its centered square first
        let side = shape.width().min(shape.height());
        let square = shape.crop_imm(
            (shape.width() - side) / 2,
            (shape.height() - side) / 2,
            side,
            side,
        );
        let mask = Mask::from_image(&square, threshold)?;
        Ok(Self {
            small: mask.resized(SMALL_MASK_SIDE),
            large: mask.resized(LARGE_MASK_SIDE),
        })
    }

    /// Writes both masks as grayscale PNGs named [`SMALL_MASK_FILE`] and [`LARGE_MASK_FILE`]
    pub fn save(&self, dir: &Path) -> Result<(PathBuf, PathBuf), IconError> {
        let small = dir.join(SMALL_MASK_FILE);
        let large = dir.join(LARGE_MASK_FILE);
        write_png(&DynamicImage::ImageLuma8(self.small.pixels.clone()), &small)?;
        write_png(&DynamicImage::ImageLuma8(self.large.pixels.clone()), &large)?;
        Ok((small, large))
    }

    pub fn for_class(&self, size_class: SizeClass) -> &Mask {
        match size_class {
            SizeClass::Small => &self.small,
            SizeClass::Large => &self.large,
        }
    }

    #[cfg(test)]
    pub(crate) fn rounded() -> Self {
        Self {
            small: Mask::rounded_square(SMALL_MASK_SIDE, 14),
            large: Mask::rounded_square(LARGE_MASK_SIDE, 26),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn opaque_masks_use_brightness() {
        let mut image = GrayImage::from_pixel(10, 10, Luma([0]));
        for y in 2..8 {
            for x in 2..8 {
                image.put_pixel(x, y, Luma([250]));
            }
        }
        let mask = Mask::from_image(&DynamicImage::ImageLuma8(image), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(mask.inside_count(), 36);
        assert!(mask.is_inside(2, 2));
        assert!(!mask.is_inside(1, 2));
    }

    #[test]
    fn transparent_masks_use_alpha() {
        // white everywhere, shape given only by alpha
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 0]));
        image.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        let mask = Mask::from_image(&DynamicImage::ImageRgba8(image), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(mask.inside_count(), 1);
    }

    #[test]
    fn outline_masks_are_filled() {
        let mut image = GrayImage::from_pixel(12, 12, Luma([0]));
        for i in 2..10 {
            image.put_pixel(i, 2, Luma([255]));
            image.put_pixel(i, 9, Luma([255]));
            image.put_pixel(2, i, Luma([255]));
            image.put_pixel(9, i, Luma([255]));
        }
        let mask = Mask::from_image(&DynamicImage::ImageLuma8(image), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(mask.inside_count(), 64);
        assert!(mask.is_inside(5, 5));
    }

    #[test]
    fn non_square_and_empty_masks_are_rejected() {
        let err = Mask::from_image(&DynamicImage::new_luma8(10, 12), DEFAULT_THRESHOLD).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingMask);
        let err = Mask::from_image(&DynamicImage::new_luma8(10, 10), DEFAULT_THRESHOLD).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingMask);
    }

    #[test]
    fn missing_file_is_a_missing_mask() {
        let err = MaskSet::load(Path::new("/no/small.png"), Path::new("/no/big.png")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingMask);
        assert!(err.is_fatal());
    }

    #[test]
    fn shape_image_gives_both_reference_sizes() {
        let shape = DynamicImage::ImageLuma8(Mask::rounded_square(300, 60).as_image().clone());
        let set = MaskSet::from_shape_image(&shape, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(set.for_class(SizeClass::Small).side(), SMALL_MASK_SIDE);
        assert_eq!(set.for_class(SizeClass::Large).side(), LARGE_MASK_SIDE);
        assert!(!set.large.is_inside(0, 0));
        assert!(set.large.is_inside(62, 62));
        assert!(set.large.as_image().pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn saved_masks_load_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let set = MaskSet::rounded();
        let (small, large) = set.save(dir.path()).unwrap();
        assert!(small.ends_with(SMALL_MASK_FILE));
        let loaded = MaskSet::load(&small, &large).unwrap();
        assert_eq!(loaded.small, set.small);
        assert_eq!(loaded.large, set.large);
    }

    #[test]
    fn rounded_square_has_transparent_corners() {
        let mask = Mask::rounded_square(20, 5);
        assert!(!mask.is_inside(0, 0));
        assert!(!mask.is_inside(19, 19));
        assert!(mask.is_inside(10, 0));
        assert!(mask.is_inside(5, 5));
    }
}
