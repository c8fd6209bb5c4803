//! Makes the background color of an extracted icon transparent.
//!
//! The background is estimated from the outer ring of the icon: the opaque ring colors
//! are grouped into clusters of similar colors and the seed of the biggest cluster is
//! taken as the background. Pixels close to it (channel-wise, within the tolerance)
//! then get alpha 0 while their color channels are left alone.
//!
//! With [`RemovalStrategy::Global`] this happens anywhere in the icon, so enclosed
//! details that share the background color disappear too. [`RemovalStrategy::FloodFill`]
//! only clears what is connected to the ring.

use std::collections::{HashMap, VecDeque};

use image::{Rgb, RgbaImage};

use crate::config::{RemovalStrategy, RemoverConfig};

/// A representative color and the number of sampled pixels it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCluster {
    pub color: Rgb<u8>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed {
        background: Rgb<u8>,
        /// Pixels that were visible before and are transparent now
        cleared: usize,
    },
    /// The ring had no opaque majority color. The image was left unchanged.
    BackgroundNotDetected,
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundRemover {
    config: RemoverConfig,
}

impl BackgroundRemover {
    pub fn new(config: RemoverConfig) -> Self {
        Self { config }
    }

    /// Clears the background in place.
    ///
    /// Transparent ring pixels count as a cluster of their own. When that cluster is the
    /// biggest, the background is considered already gone, which also makes a second
    /// run over the output a no-op.
    pub fn remove(&self, image: &mut RgbaImage) -> RemovalOutcome {
        match self.estimate_background(image) {
            Some(background) => self.clear(image, background),
            None => RemovalOutcome::BackgroundNotDetected,
        }
    }

    /// Clears pixels close to a background color that was estimated elsewhere,
    /// e.g. on the full-resolution crop the icon was scaled from.
    pub fn clear(&self, image: &mut RgbaImage, background: Rgb<u8>) -> RemovalOutcome {
        let tolerance = self.config.bg_tolerance;
        let clear = match self.config.strategy {
            RemovalStrategy::Global => {
                let mut clear = vec![false; image.width() as usize * image.height() as usize];
                for (i, pixel) in image.pixels().enumerate() {
                    clear[i] = within_tolerance(rgb(pixel), background, tolerance);
                }
                clear
            }
            RemovalStrategy::FloodFill => self.connected_to_ring(image, background),
        };

        let mut cleared = 0;
        for (pixel, clear) in image.pixels_mut().zip(clear) {
            if clear && pixel[3] != 0 {
                pixel[3] = 0;
                cleared += 1;
            }
        }
        cleared += apply_alpha_floor(image, self.config.alpha_floor);

        RemovalOutcome::Removed {
            background,
            cleared,
        }
    }

    /// Background color estimate, or `None` if the ring is mostly transparent
    pub fn estimate_background(&self, image: &RgbaImage) -> Option<Rgb<u8>> {
        let mut transparent = 0;
        let mut samples = Vec::new();
        for (x, y) in ring(image.width(), image.height(), self.config.border_sample_width) {
            let pixel = image.get_pixel(x, y);
            if pixel[3] == 0 {
                transparent += 1;
            } else {
                samples.push(rgb(pixel));
            }
        }
        let biggest = *cluster_colors(&samples, self.config.bg_tolerance).first()?;
        if biggest.count <= transparent {
            return None;
        }
        Some(biggest.color)
    }

    /// Background-colored pixels reachable from the ring. Transparent pixels
    /// can be crossed, so masked-off corners do not block the fill.
    fn connected_to_ring(&self, image: &RgbaImage, background: Rgb<u8>) -> Vec<bool> {
        let (width, height) = image.dimensions();
        let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
        let tolerance = self.config.bg_tolerance;
        let passable = |x: u32, y: u32| {
            let pixel = image.get_pixel(x, y);
            pixel[3] == 0 || within_tolerance(rgb(pixel), background, tolerance)
        };

        let mut visited = vec![false; width as usize * height as usize];
        let mut queue = VecDeque::new();
        for (x, y) in ring(width, height, self.config.border_sample_width) {
            if passable(x, y) {
                visited[index(x, y)] = true;
                queue.push_back((x, y));
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
                if nx < width && ny < height && !visited[index(nx, ny)] && passable(nx, ny) {
                    visited[index(nx, ny)] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        // transparent pixels were only walked through, clear just the colored ones
        for (i, pixel) in image.pixels().enumerate() {
            if visited[i] && !within_tolerance(rgb(pixel), background, tolerance) {
                visited[i] = false;
            }
        }
        visited
    }
}

/// Greedy grouping of colors: the most frequent remaining color seeds a cluster and
/// absorbs every remaining color within `tolerance` of it. Clusters are returned
/// biggest first.
pub fn cluster_colors(samples: &[Rgb<u8>], tolerance: u8) -> Vec<ColorCluster> {
    let mut histogram: HashMap<[u8; 3], usize> = HashMap::new();
    for color in samples {
        *histogram.entry(color.0).or_default() += 1;
    }
    let mut remaining: Vec<([u8; 3], usize)> = histogram.into_iter().collect();
    // most frequent first, ties broken by color to stay deterministic
    remaining.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut clusters = Vec::new();
    while !remaining.is_empty() {
        let (seed, seed_count) = remaining.remove(0);
        let mut count = seed_count;
        remaining.retain(|&(color, n)| {
            if within_tolerance(Rgb(color), Rgb(seed), tolerance) {
                count += n;
                false
            } else {
                true
            }
        });
        clusters.push(ColorCluster {
            color: Rgb(seed),
            count,
        });
    }
    clusters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.color.0.cmp(&b.color.0)));
    clusters
}

/// Chebyshev distance: every channel must be within `tolerance`
pub fn within_tolerance(a: Rgb<u8>, b: Rgb<u8>, tolerance: u8) -> bool {
    a.0.iter().zip(b.0.iter()).all(|(&x, &y)| x.abs_diff(y) <= tolerance)
}

/// Makes pixels below the alpha floor fully transparent, returns how many changed
fn apply_alpha_floor(image: &mut RgbaImage, floor: u8) -> usize {
    let mut changed = 0;
    for pixel in image.pixels_mut() {
        if pixel[3] != 0 && pixel[3] < floor {
            pixel[3] = 0;
            changed += 1;
        }
    }
    changed
}

fn rgb(pixel: &image::Rgba<u8>) -> Rgb<u8> {
    Rgb([pixel[0], pixel[1], pixel[2]])
}

/// Coordinates of the outermost `depth` rings of a `width` x `height` image, each pixel once
fn ring(width: u32, height: u32, depth: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..height).flat_map(move |y| {
        (0..width).filter_map(move |x| {
            let distance = x.min(y).min(width - 1 - x).min(height - 1 - y);
            (distance < depth).then_some((x, y))
        })
    })
}
