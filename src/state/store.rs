//! Annotation store: one `ImageSession` per image path plus the active key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{Annotation, ClassRegistry, ImageSize, Mask, Point};
use crate::state::session::{Candidate, ImageSession};

/// How much of the active session a reset discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Points and candidate masks only
    Pending,
    /// Also committed annotations and the mask-ID counter
    Session,
}

/// Per-image sessions keyed by path. Sessions are created lazily and kept for
/// the lifetime of the store, so navigating away and back loses nothing.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    sessions: HashMap<PathBuf, ImageSession>,
    active: Option<PathBuf>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` the active image, creating its session on first visit.
    pub fn switch_image(&mut self, path: &Path) -> &mut ImageSession {
        if self.active.as_deref() != Some(path) {
            log::debug!("Active image -> {:?}", path);
            self.active = Some(path.to_path_buf());
        }
        self.sessions.entry(path.to_path_buf()).or_default()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Result<&ImageSession> {
        self.active
            .as_ref()
            .and_then(|path| self.sessions.get(path))
            .ok_or(Error::NoActiveImage)
    }

    pub fn active_mut(&mut self) -> Result<&mut ImageSession> {
        match self.active.as_ref() {
            Some(path) => self.sessions.get_mut(path).ok_or(Error::NoActiveImage),
            None => Err(Error::NoActiveImage),
        }
    }

    pub fn session(&self, path: &Path) -> Option<&ImageSession> {
        self.sessions.get(path)
    }

    /// Get the session for a path, creating it if needed (does not change the active image).
    pub fn session_mut(&mut self, path: &Path) -> &mut ImageSession {
        self.sessions.entry(path.to_path_buf()).or_default()
    }

    /// All sessions in path order.
    pub fn sessions(&self) -> Vec<(&Path, &ImageSession)> {
        let mut all: Vec<_> = self
            .sessions
            .iter()
            .map(|(path, session)| (path.as_path(), session))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    /// Record the dimensions of the active image.
    pub fn set_image_size(&mut self, size: ImageSize) -> Result<()> {
        self.active_mut()?.image_size = Some(size);
        Ok(())
    }

    /// Append a prompt point, clamped into the image when its size is known.
    /// Returns the index of the new point.
    pub fn add_point(&mut self, point: Point) -> Result<usize> {
        let session = self.active_mut()?;
        let point = match session.image_size {
            Some(size) => {
                let (x, y) = size.clamp(i64::from(point.x), i64::from(point.y));
                Point::new(x as i32, y as i32, point.polarity)
            }
            None => point,
        };
        session.points.push(point);
        log::debug!(
            "Added {:?} point ({}, {}), {} pending",
            point.polarity,
            point.x,
            point.y,
            session.points.len()
        );
        Ok(session.points.len() - 1)
    }

    /// Remove the point at `selected` if it exists, otherwise the last point.
    /// Returns None when there was nothing to remove.
    pub fn remove_point(&mut self, selected: Option<usize>) -> Result<Option<Point>> {
        let session = self.active_mut()?;
        let removed = match selected {
            Some(index) if index < session.points.len() => Some(session.points.remove(index)),
            _ => session.points.pop(),
        };
        Ok(removed)
    }

    /// Store oracle output, best score first. Ties keep the oracle's order.
    pub fn set_candidates(&mut self, masks: Vec<Mask>, scores: Vec<f32>) -> Result<()> {
        let session = self.active_mut()?;
        let mut candidates: Vec<Candidate> = masks
            .into_iter()
            .zip(scores)
            .map(|(mask, score)| Candidate { mask, score })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        session.candidates = candidates;
        Ok(())
    }

    /// Commit the top candidate under `class_name`.
    ///
    /// The class is only registered once a candidate is known to exist, so a
    /// failed commit leaves the registry untouched. Returns the index of the new
    /// annotation.
    pub fn commit(&mut self, registry: &mut ClassRegistry, class_name: &str) -> Result<usize> {
        let class_name = class_name.trim();
        let session = self.active_mut()?;
        if session.current_candidate().is_none() {
            return Err(Error::NoActiveSegmentation);
        }
        if class_name.is_empty() {
            return Err(Error::EmptyClassName);
        }
        let class_id = registry.resolve(class_name);
        let mask_id = session.allocate_mask_id();
        let candidate = session.candidates.swap_remove(0);
        let annotation = Annotation::new(mask_id, candidate.mask, class_id, class_name);
        log::info!(
            "Committed mask {} as '{}' (id {}), bbox {:?}",
            mask_id,
            class_name,
            class_id,
            annotation.bbox
        );
        session.annotations.push(annotation);
        session.clear_pending();
        Ok(session.annotations.len() - 1)
    }

    /// Delete one annotation from the active image.
    pub fn remove_annotation(&mut self, index: usize) -> Result<Annotation> {
        let path = self.active.clone().ok_or(Error::NoActiveImage)?;
        self.remove_annotation_at(&path, index)
    }

    /// Delete one annotation from a specific image. Clears its candidates.
    pub fn remove_annotation_at(&mut self, path: &Path, index: usize) -> Result<Annotation> {
        let session = self
            .sessions
            .get_mut(path)
            .ok_or_else(|| Error::invalid_region(format!("no session for {:?}", path)))?;
        if index >= session.annotations.len() {
            return Err(Error::invalid_region(format!(
                "annotation index {} out of range ({} annotations)",
                index,
                session.annotations.len()
            )));
        }
        session.candidates.clear();
        Ok(session.annotations.remove(index))
    }

    /// Put an annotation back at `index` (clamped to the list length).
    pub fn restore_annotation(&mut self, path: &Path, index: usize, annotation: Annotation) {
        let session = self.session_mut(path);
        let index = index.min(session.annotations.len());
        session.next_mask_id = session.next_mask_id.max(annotation.mask_id + 1);
        session.annotations.insert(index, annotation);
        session.candidates.clear();
    }

    /// Replace the annotation list of an image, returning the previous list.
    pub fn replace_annotations(
        &mut self,
        path: &Path,
        annotations: Vec<Annotation>,
    ) -> Vec<Annotation> {
        let session = self.session_mut(path);
        if let Some(max_id) = annotations.iter().map(|a| a.mask_id).max() {
            session.next_mask_id = session.next_mask_id.max(max_id + 1);
        }
        session.candidates.clear();
        std::mem::replace(&mut session.annotations, annotations)
    }

    /// Propagate a class rename to every annotation in every session.
    /// Returns the number of annotations updated.
    pub fn rename_class(&mut self, class_id: u32, new_name: &str) -> usize {
        let mut updated = 0;
        for annotation in self
            .sessions
            .values_mut()
            .flat_map(|session| session.annotations.iter_mut())
            .filter(|annotation| annotation.class_id == class_id)
        {
            annotation.class_name = new_name.to_string();
            updated += 1;
        }
        updated
    }

    /// Negative prompts at the centroid of every committed mask on the active image.
    pub fn negative_prompts(&self) -> Result<Vec<Point>> {
        Ok(self
            .active()?
            .annotations
            .iter()
            .filter_map(|annotation| annotation.mask.centroid())
            .map(|(x, y)| Point::negative(x, y))
            .collect())
    }

    /// Full prompt list for the oracle: pending points, then negative centroids.
    pub fn prompts(&self) -> Result<Vec<Point>> {
        let mut prompts = self.active()?.points.clone();
        prompts.extend(self.negative_prompts()?);
        Ok(prompts)
    }

    /// Reset the active session.
    pub fn reset(&mut self, scope: ResetScope) -> Result<()> {
        let session = self.active_mut()?;
        session.clear_pending();
        if scope == ResetScope::Session {
            session.annotations.clear();
            session.next_mask_id = 0;
        }
        log::debug!("Reset active session ({:?})", scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Polarity;

    fn rect_mask(size: ImageSize, x0: i64, y0: i64, x1: i64, y1: i64) -> Mask {
        let mut mask = Mask::empty(size);
        mask.fill_rect(x0, y0, x1, y1);
        mask
    }

    fn store_with_image(path: &str, size: ImageSize) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.switch_image(Path::new(path));
        store.set_image_size(size).unwrap();
        store
    }

    #[test]
    fn test_operations_require_active_image() {
        let mut store = AnnotationStore::new();
        assert!(matches!(
            store.add_point(Point::positive(1, 1)),
            Err(Error::NoActiveImage)
        ));
        assert!(matches!(
            store.reset(ResetScope::Pending),
            Err(Error::NoActiveImage)
        ));
    }

    #[test]
    fn test_add_point_clamps_into_image() {
        let mut store = store_with_image("a.png", ImageSize::new(100, 50));
        store.add_point(Point::positive(150, -4)).unwrap();
        store.add_point(Point::positive(150, -4)).unwrap();
        let points = &store.active().unwrap().points;
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].x, points[0].y), (99, 0));
    }

    #[test]
    fn test_remove_point_selected_then_last() {
        let mut store = store_with_image("a.png", ImageSize::new(100, 100));
        for x in [10, 20, 30] {
            store.add_point(Point::positive(x, x)).unwrap();
        }
        assert_eq!(store.remove_point(Some(0)).unwrap().map(|p| p.x), Some(10));
        assert_eq!(store.remove_point(None).unwrap().map(|p| p.x), Some(30));
        // Stale selection falls back to the last point
        assert_eq!(store.remove_point(Some(7)).unwrap().map(|p| p.x), Some(20));
        assert_eq!(store.remove_point(None).unwrap(), None);
    }

    #[test]
    fn test_candidates_sorted_by_score() {
        let size = ImageSize::new(10, 10);
        let mut store = store_with_image("a.png", size);
        let masks = vec![
            rect_mask(size, 0, 0, 1, 1),
            rect_mask(size, 0, 0, 2, 2),
            rect_mask(size, 0, 0, 3, 3),
        ];
        store.set_candidates(masks, vec![0.2, 0.9, 0.5]).unwrap();
        let scores: Vec<f32> = store
            .active()
            .unwrap()
            .candidates
            .iter()
            .map(|c| c.score)
            .collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_commit_without_candidate_fails_and_registers_nothing() {
        let mut store = store_with_image("a.png", ImageSize::new(10, 10));
        let mut registry = ClassRegistry::new();
        assert!(matches!(
            store.commit(&mut registry, "cat"),
            Err(Error::NoActiveSegmentation)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_commit_clears_pending_and_assigns_ids() {
        let size = ImageSize::new(100, 100);
        let mut store = store_with_image("a.png", size);
        let mut registry = ClassRegistry::new();

        store.add_point(Point::positive(20, 20)).unwrap();
        store
            .set_candidates(vec![rect_mask(size, 5, 5, 50, 50)], vec![0.9])
            .unwrap();
        let index = store.commit(&mut registry, "cat").unwrap();

        let session = store.active().unwrap();
        assert_eq!(index, 0);
        assert!(session.points.is_empty());
        assert!(session.candidates.is_empty());
        let annotation = &session.annotations[0];
        assert_eq!(annotation.class_id, 0);
        assert_eq!(annotation.mask_id, 0);
        assert_eq!(annotation.bbox.map(|b| (b.xmin, b.ymax)), Some((5, 50)));

        store
            .set_candidates(vec![rect_mask(size, 60, 60, 70, 70)], vec![0.8])
            .unwrap();
        store.commit(&mut registry, "dog").unwrap();
        let session = store.active().unwrap();
        assert_eq!(session.annotations[1].class_id, 1);
        assert_eq!(session.annotations[1].mask_id, 1);
    }

    #[test]
    fn test_commit_empty_mask_has_no_bbox() {
        let size = ImageSize::new(10, 10);
        let mut store = store_with_image("a.png", size);
        let mut registry = ClassRegistry::new();
        store.set_candidates(vec![Mask::empty(size)], vec![0.1]).unwrap();
        store.commit(&mut registry, "cat").unwrap();
        assert!(store.active().unwrap().annotations[0].bbox.is_none());
    }

    #[test]
    fn test_sessions_survive_navigation() {
        let size = ImageSize::new(10, 10);
        let mut store = store_with_image("a.png", size);
        store.add_point(Point::positive(1, 1)).unwrap();

        store.switch_image(Path::new("b.png"));
        assert!(store.active().unwrap().points.is_empty());

        store.switch_image(Path::new("a.png"));
        assert_eq!(store.active().unwrap().points.len(), 1);
        assert_eq!(store.sessions().len(), 2);
    }

    #[test]
    fn test_negative_prompts_follow_points() {
        let size = ImageSize::new(100, 100);
        let mut store = store_with_image("a.png", size);
        let mut registry = ClassRegistry::new();
        store
            .set_candidates(vec![rect_mask(size, 10, 10, 30, 30)], vec![1.0])
            .unwrap();
        store.commit(&mut registry, "cat").unwrap();

        store.add_point(Point::positive(70, 70)).unwrap();
        let prompts = store.prompts().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].polarity, Polarity::Positive);
        assert_eq!(prompts[1], Point::negative(20, 20));
    }

    #[test]
    fn test_reset_scopes() {
        let size = ImageSize::new(10, 10);
        let mut store = store_with_image("a.png", size);
        let mut registry = ClassRegistry::new();
        store.set_candidates(vec![rect_mask(size, 1, 1, 3, 3)], vec![1.0]).unwrap();
        store.commit(&mut registry, "cat").unwrap();
        store.add_point(Point::positive(5, 5)).unwrap();

        store.reset(ResetScope::Pending).unwrap();
        let session = store.active().unwrap();
        assert!(session.points.is_empty());
        assert_eq!(session.annotations.len(), 1);

        store.reset(ResetScope::Session).unwrap();
        let session = store.active().unwrap();
        assert!(session.annotations.is_empty());
        assert_eq!(session.next_mask_id, 0);
    }

    #[test]
    fn test_remove_annotation_out_of_range() {
        let mut store = store_with_image("a.png", ImageSize::new(10, 10));
        assert!(matches!(
            store.remove_annotation(0),
            Err(Error::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_restore_annotation_keeps_mask_ids_unique() {
        let size = ImageSize::new(10, 10);
        let mut store = store_with_image("a.png", size);
        let path = PathBuf::from("a.png");
        let annotation = Annotation::new(4, rect_mask(size, 1, 1, 3, 3), 0, "cat");
        store.restore_annotation(&path, 10, annotation);
        let session = store.active().unwrap();
        assert_eq!(session.annotations.len(), 1);
        assert_eq!(session.next_mask_id, 5);
    }

    #[test]
    fn test_rename_propagates_across_sessions() {
        let size = ImageSize::new(10, 10);
        let mut store = AnnotationStore::new();
        for path in ["a.png", "b.png"] {
            store.replace_annotations(
                Path::new(path),
                vec![Annotation::new(0, rect_mask(size, 1, 1, 3, 3), 2, "cat")],
            );
        }
        assert_eq!(store.rename_class(2, "kitten"), 2);
        for (_, session) in store.sessions() {
            assert_eq!(session.annotations[0].class_name, "kitten");
        }
    }
}
