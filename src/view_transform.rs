//! Screen ⇄ image coordinate mapping under pan and zoom.
//!
//! A view is a uniform scale followed by an offset: `screen = image * scale + offset`.
//! The zoom functions are kept free of any UI type so they can be tested directly.

use serde::{Deserialize, Serialize};

use crate::constants::{CENTER_BLEND_START_SCALE, MAX_CENTER_WEIGHT, MAX_SCALE, ZOOM_FACTOR};
use crate::model::{ImageSize, PixelRect};

/// Direction of a zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

/// Tunables for zoom-around-cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomSettings {
    /// Multiplicative step per zoom event
    pub factor: f32,
    /// Upper bound on the scale; there is no lower bound
    pub max_scale: f32,
    /// Scale below which zooming out blends toward a centered view
    pub blend_start_scale: f32,
    /// Blend weight reached at scale 1.0 (and kept below it)
    pub max_center_weight: f32,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            factor: ZOOM_FACTOR,
            max_scale: MAX_SCALE,
            blend_start_scale: CENTER_BLEND_START_SCALE,
            max_center_weight: MAX_CENTER_WEIGHT,
        }
    }
}

/// Scale/offset state of the view for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ViewTransform {
    /// Create a transform with the given scale and offset.
    pub fn new(scale: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Identity transform (scale 1, no offset).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Initial view for an image: cover the canvas and center the image.
    ///
    /// Uses the larger of the two axis ratios, so the image fills the canvas
    /// and may overflow along one axis.
    pub fn fit(canvas: (u32, u32), image: ImageSize) -> Self {
        if image.is_empty() || canvas.0 == 0 || canvas.1 == 0 {
            return Self::identity();
        }
        let scale = (canvas.0 as f32 / image.width as f32)
            .max(canvas.1 as f32 / image.height as f32);
        let (offset_x, offset_y) = centered_offset(canvas, image, scale);
        Self::new(scale, offset_x, offset_y)
    }

    /// Map a screen position to image coordinates.
    pub fn to_image(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (
            (screen_x - self.offset_x) / self.scale,
            (screen_y - self.offset_y) / self.scale,
        )
    }

    /// Map an image position to screen coordinates.
    pub fn to_screen(&self, image_x: f32, image_y: f32) -> (f32, f32) {
        (
            image_x * self.scale + self.offset_x,
            image_y * self.scale + self.offset_y,
        )
    }

    /// Image pixel under a screen position, clamped into the image.
    pub fn to_image_pixel(&self, screen_x: f32, screen_y: f32, image: ImageSize) -> (u32, u32) {
        let (x, y) = self.to_image(screen_x, screen_y);
        image.clamp(x.floor() as i64, y.floor() as i64)
    }

    /// Zoom one step around the cursor.
    ///
    /// The image point under the cursor stays under the cursor. When zooming
    /// out below `blend_start_scale`, the offset is pulled toward the centered
    /// offset and rounded to whole pixels. If the scale cannot change (already
    /// at the maximum) the transform is returned unchanged.
    pub fn zoom(
        &self,
        cursor_x: f32,
        cursor_y: f32,
        direction: ZoomDirection,
        settings: &ZoomSettings,
        canvas: (u32, u32),
        image: ImageSize,
    ) -> ViewTransform {
        let proposed = match direction {
            ZoomDirection::In => self.scale * settings.factor,
            ZoomDirection::Out => self.scale / settings.factor,
        };
        let new_scale = proposed.min(settings.max_scale);
        if !new_scale.is_finite() || new_scale <= 0.0 || new_scale == self.scale {
            return *self;
        }

        let mut zoomed = self.zoom_to_cursor(new_scale, cursor_x, cursor_y);

        if direction == ZoomDirection::Out {
            let weight = center_weight(new_scale, settings);
            if weight > 0.0 {
                let (target_x, target_y) = centered_offset(canvas, image, new_scale);
                zoomed.offset_x = (zoomed.offset_x * (1.0 - weight) + target_x * weight).round();
                zoomed.offset_y = (zoomed.offset_y * (1.0 - weight) + target_y * weight).round();
            }
        }
        zoomed
    }

    /// Set a new scale while keeping the image point under the cursor fixed.
    pub fn zoom_to_cursor(&self, new_scale: f32, cursor_x: f32, cursor_y: f32) -> ViewTransform {
        let (img_x, img_y) = self.to_image(cursor_x, cursor_y);
        ViewTransform {
            scale: new_scale,
            offset_x: cursor_x - img_x * new_scale,
            offset_y: cursor_y - img_y * new_scale,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            offset_x: self.offset_x + dx,
            offset_y: self.offset_y + dy,
        }
    }

    /// The part of the image currently visible on the canvas, in image pixels.
    pub fn visible_image_rect(&self, canvas: (u32, u32), image: ImageSize) -> PixelRect {
        let to_px = |v: f32, max: u32| -> u32 { (v.trunc().max(0.0) as u32).min(max) };
        let x0 = to_px(-self.offset_x / self.scale, image.width);
        let y0 = to_px(-self.offset_y / self.scale, image.height);
        let x1 = to_px((canvas.0 as f32 - self.offset_x) / self.scale, image.width);
        let y1 = to_px((canvas.1 as f32 - self.offset_y) / self.scale, image.height);
        PixelRect::new(x0, y0, x1, y1)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Offset that centers an image of `image` size drawn at `scale`.
fn centered_offset(canvas: (u32, u32), image: ImageSize, scale: f32) -> (f32, f32) {
    let scaled_w = (image.width as f32 * scale).trunc();
    let scaled_h = (image.height as f32 * scale).trunc();
    (
        ((canvas.0 as f32 - scaled_w) / 2.0).floor(),
        ((canvas.1 as f32 - scaled_h) / 2.0).floor(),
    )
}

/// Linear ramp from 0 at `blend_start_scale` to `max_center_weight` at 1.0.
fn center_weight(scale: f32, settings: &ZoomSettings) -> f32 {
    if scale >= settings.blend_start_scale {
        return 0.0;
    }
    let span = (settings.blend_start_scale - 1.0).max(f32::EPSILON);
    ((settings.blend_start_scale - scale) / span * settings.max_center_weight)
        .min(settings.max_center_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_round_trip_screen_image() {
        for &scale in &[0.05f32, 0.5, 1.0, 3.7, 10.0] {
            let t = ViewTransform::new(scale, -123.0, 45.5);
            for &(x, y) in &[(0.0f32, 0.0f32), (10.0, 20.0), (799.0, 599.0)] {
                let (ix, iy) = t.to_image(x, y);
                let (sx, sy) = t.to_screen(ix, iy);
                assert!(approx_eq(sx, x) && approx_eq(sy, y), "scale {}", scale);
            }
        }
    }

    #[test]
    fn test_fit_covers_canvas() {
        // 200x100 image in a 400x400 canvas: height ratio (4.0) wins
        let t = ViewTransform::fit((400, 400), ImageSize::new(200, 100));
        assert!(approx_eq(t.scale, 4.0));
        assert!(approx_eq(t.offset_x, -200.0));
        assert!(approx_eq(t.offset_y, 0.0));
    }

    #[test]
    fn test_fit_degenerate_image() {
        assert_eq!(
            ViewTransform::fit((400, 400), ImageSize::new(0, 10)),
            ViewTransform::identity()
        );
    }

    #[test]
    fn test_zoom_in_keeps_cursor_point() {
        let t = ViewTransform::new(2.0, 10.0, -30.0);
        let settings = ZoomSettings::default();
        let before = t.to_image(150.0, 120.0);
        let zoomed = t.zoom(
            150.0,
            120.0,
            ZoomDirection::In,
            &settings,
            (800, 600),
            ImageSize::new(400, 300),
        );
        let after = zoomed.to_image(150.0, 120.0);

        assert!(approx_eq(zoomed.scale, 2.2));
        assert!(approx_eq(before.0, after.0));
        assert!(approx_eq(before.1, after.1));
    }

    #[test]
    fn test_zoom_in_clamped_at_max() {
        let t = ViewTransform::new(9.5, 0.0, 0.0);
        let settings = ZoomSettings::default();
        let zoomed = t.zoom(
            10.0,
            10.0,
            ZoomDirection::In,
            &settings,
            (800, 600),
            ImageSize::new(100, 100),
        );
        assert!(approx_eq(zoomed.scale, 10.0));

        // Already at the maximum: nothing changes
        let again = zoomed.zoom(
            50.0,
            50.0,
            ZoomDirection::In,
            &settings,
            (800, 600),
            ImageSize::new(100, 100),
        );
        assert_eq!(again, zoomed);
    }

    #[test]
    fn test_zoom_in_then_out_restores_scale() {
        let t = ViewTransform::new(4.0, -50.0, -20.0);
        let settings = ZoomSettings::default();
        let canvas = (800, 600);
        let image = ImageSize::new(400, 300);
        let zoomed = t
            .zoom(300.0, 200.0, ZoomDirection::In, &settings, canvas, image)
            .zoom(300.0, 200.0, ZoomDirection::Out, &settings, canvas, image);

        assert!(approx_eq(zoomed.scale, 4.0));
        // Above the blend threshold the offset is restored as well
        assert!(approx_eq(zoomed.offset_x, -50.0));
        assert!(approx_eq(zoomed.offset_y, -20.0));
    }

    #[test]
    fn test_zoom_out_has_no_minimum() {
        let mut t = ViewTransform::new(1.0, 0.0, 0.0);
        let settings = ZoomSettings::default();
        for _ in 0..100 {
            t = t.zoom(
                0.0,
                0.0,
                ZoomDirection::Out,
                &settings,
                (800, 600),
                ImageSize::new(100, 100),
            );
        }
        assert!(t.scale > 0.0 && t.scale < 0.001);
        assert!(t.scale.is_finite());
    }

    #[test]
    fn test_zoom_out_blends_toward_center() {
        let settings = ZoomSettings::default();
        let canvas = (800, 600);
        let image = ImageSize::new(400, 300);
        let t = ViewTransform::new(1.65, 0.0, 0.0);
        let zoomed = t.zoom(0.0, 0.0, ZoomDirection::Out, &settings, canvas, image);

        // new scale 1.5 -> weight 0.3; anchored offset is (0, 0)
        assert!(approx_eq(zoomed.scale, 1.5));
        let target_x = ((800.0f32 - 600.0) / 2.0).floor();
        let target_y = ((600.0f32 - 450.0) / 2.0).floor();
        assert!(approx_eq(zoomed.offset_x, (target_x * 0.3).round()));
        assert!(approx_eq(zoomed.offset_y, (target_y * 0.3).round()));
    }

    #[test]
    fn test_center_weight_ramp() {
        let settings = ZoomSettings::default();
        assert_eq!(center_weight(2.5, &settings), 0.0);
        assert_eq!(center_weight(2.0, &settings), 0.0);
        assert!(approx_eq(center_weight(1.5, &settings), 0.3));
        assert!(approx_eq(center_weight(1.0, &settings), 0.6));
        assert!(approx_eq(center_weight(0.2, &settings), 0.6));
    }

    #[test]
    fn test_pan_by() {
        let t = ViewTransform::new(1.0, 10.0, 20.0);
        let panned = t.pan_by(5.0, -10.0);

        assert_eq!(panned.scale, 1.0);
        assert_eq!(panned.offset_x, 15.0);
        assert_eq!(panned.offset_y, 10.0);
    }

    #[test]
    fn test_visible_rect() {
        let image = ImageSize::new(1000, 1000);
        let t = ViewTransform::new(2.0, -200.0, -100.0);
        let rect = t.visible_image_rect((400, 300), image);
        assert_eq!(rect, PixelRect::new(100, 50, 300, 200));

        // Image smaller than canvas: whole image visible
        let t = ViewTransform::new(0.5, 50.0, 50.0);
        let rect = t.visible_image_rect((800, 800), image);
        assert_eq!(rect, PixelRect::new(0, 0, 1000, 1000));
    }

    #[test]
    fn test_to_image_pixel_clamps() {
        let t = ViewTransform::new(2.0, 100.0, 100.0);
        let image = ImageSize::new(50, 50);
        assert_eq!(t.to_image_pixel(0.0, 0.0, image), (0, 0));
        assert_eq!(t.to_image_pixel(120.0, 130.0, image), (10, 15));
        assert_eq!(t.to_image_pixel(1000.0, 1000.0, image), (49, 49));
    }
}
