//! Hover and selection hit testing over prompt points and committed masks.

use crate::constants::{HIT_OCCUPANCY_THRESHOLD, POINT_HIT_RADIUS_PX};
use crate::model::{Annotation, ImageSize, Point};
use crate::view_transform::ViewTransform;

/// What the pointer is currently over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    /// Index of the pending point under the pointer
    pub point: Option<usize>,
    /// Index of the committed annotation under the pointer
    pub annotation: Option<usize>,
}

/// Hit-test parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Picker {
    /// Points closer than this (in screen pixels) can be picked
    pub radius_px: f32,
    /// Mask value a pixel must exceed to count as a hit
    pub occupancy_threshold: f32,
}

impl Default for Picker {
    fn default() -> Self {
        Self {
            radius_px: POINT_HIT_RADIUS_PX,
            occupancy_threshold: HIT_OCCUPANCY_THRESHOLD,
        }
    }
}

impl Picker {
    pub fn new(radius_px: f32, occupancy_threshold: f32) -> Self {
        Self {
            radius_px,
            occupancy_threshold,
        }
    }

    /// Nearest pending point whose screen distance is strictly below the radius.
    pub fn nearest_point(
        &self,
        screen: (f32, f32),
        points: &[Point],
        view: &ViewTransform,
    ) -> Option<usize> {
        points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let (sx, sy) = view.to_screen(point.x as f32, point.y as f32);
                (index, (sx - screen.0).hypot(sy - screen.1))
            })
            .filter(|&(_, distance)| distance < self.radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// First annotation (lowest index) whose mask covers the pixel under `screen`.
    ///
    /// The position is clamped into the image, so pointing past an edge tests
    /// the edge pixel.
    pub fn mask_at(
        &self,
        screen: (f32, f32),
        annotations: &[Annotation],
        view: &ViewTransform,
        image: ImageSize,
    ) -> Option<usize> {
        if image.is_empty() {
            return None;
        }
        let (x, y) = view.to_image_pixel(screen.0, screen.1, image);
        annotations
            .iter()
            .position(|annotation| annotation.mask.value(x, y) > self.occupancy_threshold)
    }

    /// Refresh hover state for a pointer position.
    pub fn hover(
        &self,
        screen: (f32, f32),
        points: &[Point],
        annotations: &[Annotation],
        view: &ViewTransform,
        image: ImageSize,
    ) -> HoverState {
        HoverState {
            point: self.nearest_point(screen, points, view),
            annotation: self.mask_at(screen, annotations, view, image),
        }
    }
}
