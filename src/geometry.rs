//! Boxes in screenshot pixel coordinates and the arithmetic the detector needs on them.

use std::fmt::Display;

/// Axis-aligned rectangle; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing all of the given points, or `None` for no points
    pub fn enclosing(points: impl IntoIterator<Item = (u32, u32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0;
        }
        u64::from(right - left) * u64::from(bottom - top)
    }

    /// Intersection over union, in `0.0..=1.0`. Two empty boxes have an IoU of 0.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        }
    }

    /// Expands the box into a square whose side is the longer of width and height,
    /// centered on this box's center. Returns signed coordinates since the square
    /// may stick out past the top or left edge of the image.
    pub fn centered_square(&self) -> SignedSquare {
        let side = self.width.max(self.height);
        let center_x2 = 2 * i64::from(self.x) + i64::from(self.width);
        let center_y2 = 2 * i64::from(self.y) + i64::from(self.height);
        SignedSquare {
            x: (center_x2 - i64::from(side)) / 2,
            y: (center_y2 - i64::from(side)) / 2,
            side,
        }
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // imagemagick geometry notation
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A square that is not yet clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedSquare {
    pub x: i64,
    pub y: i64,
    pub side: u32,
}

impl SignedSquare {
    /// Grows the square by `margin` pixels on every side, saturating at `u32::MAX`
    pub fn padded(&self, margin: u32) -> SignedSquare {
        SignedSquare {
            x: self.x - i64::from(margin),
            y: self.y - i64::from(margin),
            side: self.side.saturating_add(margin.saturating_mul(2)),
        }
    }

    /// Share of the square's area that lies inside a `width` x `height` image
    pub fn inside_fraction(&self, width: u32, height: u32) -> f64 {
        if self.side == 0 {
            return 0.0;
        }
        let side = i64::from(self.side);
        let visible_w = (self.x + side).min(i64::from(width)) - self.x.max(0);
        let visible_h = (self.y + side).min(i64::from(height)) - self.y.max(0);
        if visible_w <= 0 || visible_h <= 0 {
            return 0.0;
        }
        (visible_w * visible_h) as f64 / (side * side) as f64
    }

    /// Slides the square inside the image without changing its shape.
    /// Only a square larger than the image itself is shrunk.
    pub fn shift_inside(&self, width: u32, height: u32) -> BoundingBox {
        let side = self.side.min(width).min(height);
        let max_x = i64::from(width - side);
        let max_y = i64::from(height - side);
        // re-center if we had to shrink
        let shrink = i64::from(self.side - side) / 2;
        let x = (self.x + shrink).clamp(0, max_x);
        let y = (self.y + shrink).clamp(0, max_y);
        BoundingBox::new(x as u32, y as u32, side, side)
    }
}

/// Which reference mask and output size an icon gets.
#[derive(strum::IntoStaticStr, strum::VariantArray, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum SizeClass {
    Small,
    Large,
}

impl Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stringified: &'static str = self.into();
        f.write_str(stringified)
    }
}

/// Sorts boxes into reading order: rows from top to bottom, left to right within a row.
/// Two boxes share a row when the vertical distance between their centers
/// is less than half the height of the row's first box.
pub fn sort_reading_order<T>(items: &mut Vec<T>, bounds: impl Fn(&T) -> BoundingBox) {
    items.sort_by_key(|item| {
        let b = bounds(item);
        (2 * u64::from(b.y) + u64::from(b.height), b.x)
    });

    let mut sorted = Vec::with_capacity(items.len());
    let mut row: Vec<T> = Vec::new();
    let mut row_center2 = 0u64;
    let mut row_height = 0u64;
    for item in items.drain(..) {
        let b = bounds(&item);
        let center2 = 2 * u64::from(b.y) + u64::from(b.height);
        // both sides are doubled to stay in integers
        if !row.is_empty() && center2 - row_center2 >= row_height {
            row.sort_by_key(|item| bounds(item).x);
            sorted.append(&mut row);
        }
        if row.is_empty() {
            row_center2 = center2;
            row_height = u64::from(b.height);
        }
        row.push(item);
    }
    row.sort_by_key(|item| bounds(item).x);
    sorted.append(&mut row);
    *items = sorted;
}
