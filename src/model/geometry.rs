//! Pixel-space geometry shared by masks, annotations and the view.

use serde::{Deserialize, Serialize};

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp a (possibly out-of-range) pixel coordinate into the image.
    pub fn clamp(&self, x: i64, y: i64) -> (u32, u32) {
        let max_x = i64::from(self.width.saturating_sub(1));
        let max_y = i64::from(self.height.saturating_sub(1));
        (x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32)
    }

    /// Full-image rectangle.
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }
}

/// Tight bounding box of a mask, inclusive on both ends.
///
/// Only constructed when `xmin < xmax` and `ymin < ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    /// Build a box from an inclusive extent. Returns None for degenerate extents.
    pub fn from_extent(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Option<Self> {
        if xmin < xmax && ymin < ymax {
            Some(Self {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }

    /// Number of pixels covered (inclusive extent).
    pub fn pixel_area(&self) -> u64 {
        u64::from(self.width() + 1) * u64::from(self.height() + 1)
    }

    /// Intersection over union of the covered pixel sets.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix0 = self.xmin.max(other.xmin);
        let iy0 = self.ymin.max(other.ymin);
        let ix1 = self.xmax.min(other.xmax);
        let iy1 = self.ymax.min(other.ymax);
        if ix0 > ix1 || iy0 > iy1 {
            return 0.0;
        }
        let inter = u64::from(ix1 - ix0 + 1) * u64::from(iy1 - iy0 + 1);
        let union = self.pixel_area() + other.pixel_area() - inter;
        inter as f32 / union as f32
    }
}

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}
