//! Raster occupancy masks.

use image::{GrayImage, Luma};
use ndarray::{Array2, s};

use crate::constants::MASK_THRESHOLD;
use crate::model::geometry::{BoundingBox, ImageSize, PixelRect};

/// Per-pixel occupancy grid, indexed `[row, column]` (i.e. `[y, x]`).
///
/// Values are usually 0.0/1.0; oracle output may carry soft values, so
/// every consumer compares against a threshold instead of testing for 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<f32>,
}

impl Mask {
    /// An all-zero mask of the given size.
    pub fn empty(size: ImageSize) -> Self {
        Self {
            data: Array2::zeros((size.height as usize, size.width as usize)),
        }
    }

    /// Wrap an `height × width` array.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Convert a grayscale raster (any non-zero pixel is occupied).
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            if image.get_pixel(x as u32, y as u32)[0] > 0 {
                1.0
            } else {
                0.0
            }
        });
        Self { data }
    }

    /// Binarize into a grayscale raster: 255 for set pixels, 0 elsewhere.
    pub fn to_gray_image(&self) -> GrayImage {
        let size = self.size();
        GrayImage::from_fn(size.width, size.height, |x, y| {
            if self.is_set(x, y) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn size(&self) -> ImageSize {
        let (rows, cols) = self.data.dim();
        ImageSize::new(cols as u32, rows as u32)
    }

    pub fn width(&self) -> u32 {
        self.size().width
    }

    pub fn height(&self) -> u32 {
        self.size().height
    }

    /// Raw value at a pixel; 0.0 outside the grid.
    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.data
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a pixel counts as part of the region.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.value(x, y) > MASK_THRESHOLD
    }

    /// Fill the inclusive rectangle between two corners, clipped to the grid.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let size = self.size();
        if size.is_empty() {
            return;
        }
        let (lx, hx) = (x0.min(x1), x0.max(x1));
        let (ly, hy) = (y0.min(y1), y0.max(y1));
        if hx < 0 || hy < 0 || lx >= i64::from(size.width) || ly >= i64::from(size.height) {
            return;
        }
        let (cx0, cy0) = size.clamp(lx, ly);
        let (cx1, cy1) = size.clamp(hx, hy);
        self.data
            .slice_mut(s![cy0 as usize..=cy1 as usize, cx0 as usize..=cx1 as usize])
            .fill(1.0);
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v > MASK_THRESHOLD).count()
    }

    /// True when no pixel is set.
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v > MASK_THRESHOLD)
    }

    /// Inclusive extent `(xmin, ymin, xmax, ymax)` of set pixels, possibly degenerate.
    pub fn extent(&self) -> Option<(u32, u32, u32, u32)> {
        let mut extent: Option<(u32, u32, u32, u32)> = None;
        for ((y, x), &v) in self.data.indexed_iter() {
            if v <= MASK_THRESHOLD {
                continue;
            }
            let (x, y) = (x as u32, y as u32);
            extent = Some(match extent {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        extent
    }

    /// Tight bounding box; absent for empty or single-row/column masks.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let (x0, y0, x1, y1) = self.extent()?;
        BoundingBox::from_extent(x0, y0, x1, y1)
    }

    /// Mean position of set pixels, truncated to integer pixels.
    pub fn centroid(&self) -> Option<(i32, i32)> {
        let mut sum_x = 0u64;
        let mut sum_y = 0u64;
        let mut n = 0u64;
        for ((y, x), &v) in self.data.indexed_iter() {
            if v > MASK_THRESHOLD {
                sum_x += x as u64;
                sum_y += y as u64;
                n += 1;
            }
        }
        if n == 0 {
            return None;
        }
        Some(((sum_x / n) as i32, (sum_y / n) as i32))
    }

    /// Zero every pixel outside `rect`.
    pub fn clip_to(&mut self, rect: PixelRect) {
        for ((y, x), v) in self.data.indexed_iter_mut() {
            if !rect.contains(x as u32, y as u32) {
                *v = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(size: ImageSize, x0: i64, y0: i64, x1: i64, y1: i64) -> Mask {
        let mut mask = Mask::empty(size);
        mask.fill_rect(x0, y0, x1, y1);
        mask
    }

    #[test]
    fn test_bbox_of_rectangle() {
        let mask = rect_mask(ImageSize::new(100, 100), 5, 5, 50, 50);
        assert_eq!(
            mask.bbox(),
            Some(BoundingBox {
                xmin: 5,
                ymin: 5,
                xmax: 50,
                ymax: 50
            })
        );
        assert_eq!(mask.count(), 46 * 46);
    }

    #[test]
    fn test_empty_mask_has_no_bbox_or_centroid() {
        let mask = Mask::empty(ImageSize::new(10, 10));
        assert!(mask.is_empty());
        assert!(mask.bbox().is_none());
        assert!(mask.centroid().is_none());
    }

    #[test]
    fn test_single_pixel_has_extent_but_no_bbox() {
        let mask = rect_mask(ImageSize::new(10, 10), 3, 4, 3, 4);
        assert_eq!(mask.extent(), Some((3, 4, 3, 4)));
        assert!(mask.bbox().is_none());
    }

    #[test]
    fn test_centroid() {
        let mask = rect_mask(ImageSize::new(100, 100), 10, 20, 30, 40);
        assert_eq!(mask.centroid(), Some((20, 30)));
    }

    #[test]
    fn test_fill_rect_clips_and_normalizes() {
        let mask = rect_mask(ImageSize::new(10, 10), 12, 8, 7, -3);
        assert_eq!(mask.extent(), Some((7, 0, 9, 8)));
    }

    #[test]
    fn test_clip_to_rect() {
        let mut mask = rect_mask(ImageSize::new(20, 20), 0, 0, 19, 19);
        mask.clip_to(PixelRect::new(5, 5, 10, 10));
        assert_eq!(mask.extent(), Some((5, 5, 9, 9)));
    }

    #[test]
    fn test_soft_values_use_threshold() {
        let mut data = Array2::zeros((4, 4));
        data[[1, 1]] = 0.3;
        data[[2, 2]] = 0.9;
        let mask = Mask::from_array(data);
        assert!(!mask.is_set(1, 1));
        assert!(mask.is_set(2, 2));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_gray_image_conversion() {
        let mask = rect_mask(ImageSize::new(8, 6), 1, 1, 3, 2);
        let gray = mask.to_gray_image();
        assert_eq!(gray.dimensions(), (8, 6));
        assert_eq!(gray.get_pixel(2, 2)[0], 255);
        assert_eq!(gray.get_pixel(5, 5)[0], 0);
        assert_eq!(Mask::from_gray_image(&gray), mask);
    }
}
