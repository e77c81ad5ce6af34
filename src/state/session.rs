//! Per-image editing state.

use crate::model::{Annotation, ImageSize, Mask, MaskId, Point};
use crate::view_transform::ViewTransform;

/// A mask returned by the oracle together with its confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub mask: Mask,
    pub score: f32,
}

/// Everything the annotator remembers about one image.
#[derive(Clone, Debug, Default)]
pub struct ImageSession {
    /// Pending prompt points in insertion order
    pub points: Vec<Point>,
    /// Oracle output for the pending points, best score first
    pub candidates: Vec<Candidate>,
    /// Committed annotations in commit order
    pub annotations: Vec<Annotation>,
    /// Mask ID handed to the next commit
    pub next_mask_id: MaskId,
    /// Image dimensions, known once the image has been read
    pub image_size: Option<ImageSize>,
    /// View for this image; None until first displayed
    pub view: Option<ViewTransform>,
}

impl ImageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-ranked candidate, which is what a commit stores.
    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Drop points and candidates, keeping annotations.
    pub fn clear_pending(&mut self) {
        self.points.clear();
        self.candidates.clear();
    }

    /// Reserve the next mask ID.
    pub fn allocate_mask_id(&mut self) -> MaskId {
        let id = self.next_mask_id;
        self.next_mask_id += 1;
        id
    }
}
