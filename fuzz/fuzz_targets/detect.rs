#![no_main]

use std::num::NonZeroU8;

use arbitrary::Unstructured;
use iconsnip::config::DetectorConfig;
use iconsnip::detect::Detector;
use image::{DynamicImage, RgbImage};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct StructuredImage {
    width: NonZeroU8,
    height: NonZeroU8,
    rgb_data: Vec<u8>,
}

impl StructuredImage {
    fn to_image(&self) -> DynamicImage {
        let width = self.width.get() as u32;
        let image = RgbImage::from_fn(width, self.height.get() as u32, |x, y| {
            let idx = (y * width + x) as usize * 3;
            image::Rgb([
                self.rgb_data[idx],
                self.rgb_data[idx + 1],
                self.rgb_data[idx + 2],
            ])
        });
        DynamicImage::ImageRgb8(image)
    }
}

impl<'a> arbitrary::Arbitrary<'a> for StructuredImage {
    fn arbitrary(unstructured: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let width: NonZeroU8 = unstructured.arbitrary()?;
        let height: NonZeroU8 = unstructured.arbitrary()?;
        let rgb_data_len = width.get() as usize * height.get() as usize * 3;
        let rgb_data = unstructured.bytes(rgb_data_len)?;

        Ok(Self {
            width,
            height,
            rgb_data: rgb_data.to_vec(),
        })
    }
}

fuzz_target!(|input: (StructuredImage, u8, u8)| {
    let (image, margin, overlap) = input;
    let config = DetectorConfig {
        // small enough that a 255x255 input can hold candidates
        min_area: 100,
        max_area: 20000,
        min_side: 8,
        crop_margin: u32::from(margin % 16),
        overlap_threshold: f64::from(overlap) / 255.0,
        ..Default::default()
    };
    let threshold = config.overlap_threshold;
    let screenshot = image.to_image();
    let candidates = Detector::new(config)
        .detect(&screenshot)
        .expect("a non-empty image must be accepted");

    for (i, a) in candidates.iter().enumerate() {
        // crops are squares inside the screenshot
        assert_eq!(a.crop.width, a.crop.height);
        assert!(a.crop.right() <= screenshot.width());
        assert!(a.crop.bottom() <= screenshot.height());
        // surviving boxes do not overlap above the threshold
        for b in &candidates[i + 1..] {
            assert!(a.bounds.iou(&b.bounds) <= threshold, "{a:?} {b:?}");
        }
    }
});
