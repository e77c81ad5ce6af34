//! Committed annotations.

use crate::model::geometry::BoundingBox;
use crate::model::mask::Mask;

/// Per-image identifier assigned at commit time.
pub type MaskId = u32;

/// A committed (mask, class) pair with its derived bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Per-image counter value at commit time.
    pub mask_id: MaskId,
    /// The region, sized to the source image.
    pub mask: Mask,
    /// Class ID from the registry.
    pub class_id: u32,
    /// Class name at the time of the last rename.
    pub class_name: String,
    /// Tight extent of the mask; None when degenerate.
    pub bbox: Option<BoundingBox>,
}

impl Annotation {
    /// Create an annotation, deriving the bounding box from the mask.
    pub fn new(mask_id: MaskId, mask: Mask, class_id: u32, class_name: impl Into<String>) -> Self {
        let bbox = mask.bbox();
        Self {
            mask_id,
            mask,
            class_id,
            class_name: class_name.into(),
            bbox,
        }
    }
}
