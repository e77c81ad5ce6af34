//! Single-threaded session controller.
//!
//! Owns all session state and applies [`Message`]s one at a time. The oracle
//! call is synchronous: the controller is marked busy for its duration.

use std::path::{Path, PathBuf};

use web_time::Instant;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::format::crop::{self, CropRect, CropState};
use crate::format::{
    ExportOptions, ExportResult, FormatWarning, ImageLabels, LabelMode, export_labels,
    import_labels,
};
use crate::message::Message;
use crate::model::{Annotation, ClassRegistry, ImageSize, Point, Polarity};
use crate::oracle::{OracleRequest, SegmentationOracle};
use crate::picker::{HoverState, Picker};
use crate::state::{AnnotationStore, ProjectState, ResetScope};
use crate::undo::{Command, UndoConfig, UndoStack, redo_command, undo_command};
use crate::view_transform::{ViewTransform, ZoomDirection, ZoomSettings};

/// What a dispatched message produced beyond a state change.
#[derive(Debug)]
pub enum Outcome {
    /// State updated (or intentionally left alone); see [`SessionController::status`]
    Done,
    /// Labels were written
    Exported(ExportResult),
    /// Labels were loaded into the store
    Imported {
        images: usize,
        annotations: usize,
        warnings: Vec<FormatWarning>,
    },
}

/// The annotation session: per-image state, classes, view and history.
pub struct SessionController {
    config: AppConfig,
    store: AnnotationStore,
    registry: ClassRegistry,
    project: Option<ProjectState>,
    picker: Picker,
    zoom: ZoomSettings,
    oracle: Option<Box<dyn SegmentationOracle>>,
    undo: UndoStack,
    canvas: (u32, u32),
    hover: HoverState,
    crop: CropState,
    busy: bool,
    status: String,
}

impl SessionController {
    pub fn new(config: AppConfig) -> Self {
        let registry = ClassRegistry::from_names(&config.classes);
        let picker = config.picking.picker();
        let zoom = config.view.zoom_settings();
        let undo = UndoStack::with_config(UndoConfig {
            max_history: config.preferences.undo_history,
        });
        Self {
            config,
            store: AnnotationStore::new(),
            registry,
            project: None,
            picker,
            zoom,
            oracle: None,
            undo,
            canvas: crate::constants::DEFAULT_CANVAS_SIZE,
            hover: HoverState::default(),
            crop: CropState::default(),
            busy: false,
            status: String::new(),
        }
    }

    /// Attach a segmentation oracle.
    pub fn with_oracle(mut self, oracle: Box<dyn SegmentationOracle>) -> Self {
        self.set_oracle(oracle);
        self
    }

    pub fn set_oracle(&mut self, oracle: Box<dyn SegmentationOracle>) {
        log::info!("Using segmentation oracle '{}'", oracle.id());
        self.oracle = Some(oracle);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn project(&self) -> Option<&ProjectState> {
        self.project.as_ref()
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn crop(&self) -> CropState {
        self.crop
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.canvas
    }

    /// True while an oracle call is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Last user-facing status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        log::debug!("Status: {}", self.status);
    }

    /// Apply one message.
    pub fn dispatch(&mut self, message: Message) -> Result<Outcome> {
        log::trace!("dispatch {:?}", message);
        match message {
            Message::OpenFolder(dir) => self.open_folder(&dir)?,
            Message::SwitchImage(path) => self.switch_image(&path)?,
            Message::NextImage => self.navigate(true)?,
            Message::PrevImage => self.navigate(false)?,
            Message::Resize { width, height } => {
                self.canvas = (width, height);
                log::debug!("Canvas resized to {}x{}", width, height);
            }
            Message::Zoom { x, y, direction } => self.zoom(x, y, direction)?,
            Message::Pan { dx, dy } => {
                let session = self.store.active_mut()?;
                let view = session.view.unwrap_or_default();
                session.view = Some(view.pan_by(dx, dy));
            }
            Message::PointerMoved { x, y } => self.refresh_hover(x, y),
            Message::AddPoint { x, y, polarity } => self.add_point(x, y, polarity)?,
            Message::RemovePoint => self.remove_point()?,
            Message::SecondaryClick { x, y } => self.secondary_click(x, y)?,
            Message::Segment => self.segment()?,
            Message::Commit { class_name } => self.commit(&class_name)?,
            Message::RemoveAnnotation(index) => self.remove_annotation(index)?,
            Message::RenameClass { old, new } => self.rename_class(&old, &new)?,
            Message::Reset => {
                self.store.reset(ResetScope::Pending)?;
                self.hover = HoverState::default();
                self.set_status("Cleared points and masks");
            }
            Message::ResetSession => self.reset_session()?,
            Message::Undo => self.undo(true)?,
            Message::Redo => self.undo(false)?,
            Message::SetCrop { x0, y0, x1, y1 } => {
                let rect = CropRect::from_corners(x0, y0, x1, y1);
                if self.crop.set(rect) {
                    self.set_status(format!("Crop rectangle {}", rect));
                } else {
                    self.set_status("Crop rectangle is locked");
                }
            }
            Message::ClearCrop => {
                if self.crop.clear() {
                    self.set_status("Crop rectangle cleared");
                } else {
                    self.set_status("Crop rectangle is locked");
                }
            }
            Message::ToggleCropLock => {
                let locked = self.crop.toggle_lock();
                self.set_status(if locked { "Crop locked" } else { "Crop unlocked" });
            }
            Message::CropAll { dir } => return self.crop_all(&dir).map(Outcome::Exported),
            Message::SaveCrop { dir } => {
                let rect = self
                    .crop
                    .rect
                    .ok_or_else(|| Error::invalid_region("no crop rectangle drawn"))?;
                let image = self.active_image()?;
                let path = crop::save_coords(&dir, &image, &rect)?;
                self.set_status(format!("Saved crop to {}", path.display()));
            }
            Message::LoadCrop { dir } => {
                let image = self.active_image()?;
                let rect = crop::load_coords(&dir, &image)?;
                self.crop.rect = Some(rect);
                self.set_status(format!("Loaded crop rectangle {}", rect));
            }
            Message::Export { dir, mode } => {
                let result = self.export(&dir, mode)?;
                return Ok(Outcome::Exported(result));
            }
            Message::Import { dir } => return self.import(&dir),
        }
        Ok(Outcome::Done)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn open_folder(&mut self, dir: &Path) -> Result<()> {
        let project = ProjectState::from_folder(dir)?;
        let first = project.current_image().map(Path::to_path_buf);
        self.project = Some(project);
        if let Some(first) = first {
            self.switch_image(&first)?;
        }
        Ok(())
    }

    /// Show an image whose size is already known (e.g. decoded by a UI).
    ///
    /// The view is fitted to the canvas on first display and kept afterwards.
    pub fn show_image(&mut self, path: &Path, size: ImageSize) {
        let canvas = self.canvas;
        let session = self.store.switch_image(path);
        session.image_size = Some(size);
        if session.view.is_none() {
            session.view = Some(ViewTransform::fit(canvas, size));
        }
        self.hover = HoverState::default();
        if let Some(project) = self.project.as_mut() {
            project.select(path);
        }
        let progress = self
            .project
            .as_ref()
            .map(|p| format!(" ({})", p.progress()))
            .unwrap_or_default();
        self.set_status(format!("{}{}", path.display(), progress));
        log::info!("Showing {:?} ({}x{})", path, size.width, size.height);
    }

    fn switch_image(&mut self, path: &Path) -> Result<()> {
        let size = self.image_size_of(path)?;
        self.show_image(path, size);
        Ok(())
    }

    fn image_size_of(&self, path: &Path) -> Result<ImageSize> {
        if let Some(size) = self.store.session(path).and_then(|s| s.image_size) {
            return Ok(size);
        }
        let (width, height) = image::image_dimensions(path)?;
        Ok(ImageSize::new(width, height))
    }

    fn navigate(&mut self, forward: bool) -> Result<()> {
        let project = self.project.as_mut().ok_or(Error::NoActiveImage)?;
        let moved = if forward { project.next() } else { project.prev() };
        if !moved {
            self.set_status(if forward {
                "Already at the last image"
            } else {
                "Already at the first image"
            });
            return Ok(());
        }
        let path = project
            .current_image()
            .map(Path::to_path_buf)
            .ok_or(Error::NoActiveImage)?;
        self.switch_image(&path)
    }

    // ------------------------------------------------------------------
    // View and picking
    // ------------------------------------------------------------------

    fn active_view(&self) -> Result<(ViewTransform, ImageSize)> {
        let session = self.store.active()?;
        let size = session.image_size.ok_or(Error::NoActiveImage)?;
        let view = session
            .view
            .unwrap_or_else(|| ViewTransform::fit(self.canvas, size));
        Ok((view, size))
    }

    fn zoom(&mut self, x: f32, y: f32, direction: ZoomDirection) -> Result<()> {
        let (view, size) = self.active_view()?;
        let zoomed = view.zoom(x, y, direction, &self.zoom, self.canvas, size);
        self.store.active_mut()?.view = Some(zoomed);
        log::debug!("Zoom {:?} -> scale {:.3}", direction, zoomed.scale);
        Ok(())
    }

    fn refresh_hover(&mut self, x: f32, y: f32) {
        let Ok((view, size)) = self.active_view() else {
            self.hover = HoverState::default();
            return;
        };
        let hover = match self.store.active() {
            Ok(session) => self.picker.hover(
                (x, y),
                &session.points,
                &session.annotations,
                &view,
                size,
            ),
            Err(_) => HoverState::default(),
        };
        self.hover = hover;
    }

    // ------------------------------------------------------------------
    // Prompting and segmentation
    // ------------------------------------------------------------------

    fn add_point(&mut self, x: f32, y: f32, polarity: Polarity) -> Result<()> {
        let (view, size) = self.active_view()?;
        let (ix, iy) = view.to_image_pixel(x, y, size);
        let index = self
            .store
            .add_point(Point::new(ix as i32, iy as i32, polarity))?;
        self.set_status(format!("Point {} at ({}, {})", index + 1, ix, iy));
        Ok(())
    }

    fn remove_point(&mut self) -> Result<()> {
        match self.store.remove_point(self.hover.point)? {
            Some(point) => {
                self.hover.point = None;
                self.set_status(format!("Removed point ({}, {})", point.x, point.y));
            }
            None => self.set_status("No points to remove"),
        }
        Ok(())
    }

    fn secondary_click(&mut self, x: f32, y: f32) -> Result<()> {
        self.refresh_hover(x, y);
        if let Some(index) = self.hover.annotation {
            return self.remove_annotation(Some(index));
        }
        self.remove_point()
    }

    fn segment(&mut self) -> Result<()> {
        let (view, size) = self.active_view()?;
        let image_path = self
            .store
            .active_path()
            .map(Path::to_path_buf)
            .ok_or(Error::NoActiveImage)?;
        if self.store.active()?.points.is_empty() {
            return Err(Error::NoPrompts);
        }
        let request = OracleRequest {
            image_path,
            image_size: size,
            points: self.store.prompts()?,
        };
        let oracle = self.oracle.as_mut().ok_or(Error::OracleUnavailable)?;

        self.busy = true;
        let started = Instant::now();
        let prediction = oracle.predict(&request);
        self.busy = false;
        log::info!(
            "Oracle '{}' answered in {:.1} ms ({} prompts)",
            oracle.id(),
            started.elapsed().as_secs_f64() * 1000.0,
            request.points.len()
        );
        let mut prediction = prediction?;
        prediction.validate(size)?;

        let visible = view.visible_image_rect(self.canvas, size);
        for mask in &mut prediction.masks {
            mask.clip_to(visible);
        }
        let count = prediction.masks.len();
        self.store
            .set_candidates(prediction.masks, prediction.scores)?;
        let best = self
            .store
            .active()?
            .current_candidate()
            .map(|c| c.score)
            .unwrap_or_default();
        self.set_status(format!("{} candidate masks, best score {:.3}", count, best));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    fn active_image(&self) -> Result<PathBuf> {
        self.store
            .active_path()
            .map(Path::to_path_buf)
            .ok_or(Error::NoActiveImage)
    }

    fn commit(&mut self, class_name: &str) -> Result<()> {
        let image = self.active_image()?;
        let index = self.store.commit(&mut self.registry, class_name)?;
        let annotation = self.store.active()?.annotations[index].clone();
        self.set_status(format!(
            "Committed '{}' (class {})",
            annotation.class_name, annotation.class_id
        ));
        self.undo.push(Command::AddAnnotation {
            image,
            index,
            annotation,
        });
        self.hover = HoverState::default();
        Ok(())
    }

    fn remove_annotation(&mut self, index: Option<usize>) -> Result<()> {
        let index = index
            .or(self.hover.annotation)
            .ok_or_else(|| Error::invalid_region("no annotation selected"))?;
        let image = self.active_image()?;
        let annotation = self.store.remove_annotation(index)?;
        self.set_status(format!("Removed '{}'", annotation.class_name));
        self.undo.push(Command::RemoveAnnotation {
            image,
            index,
            annotation,
        });
        self.hover = HoverState::default();
        Ok(())
    }

    fn rename_class(&mut self, old: &str, new: &str) -> Result<()> {
        let id = self.registry.rename(old, new)?;
        let name = self.registry.name_of(id).unwrap_or(new).to_string();
        let updated = self.store.rename_class(id, &name);
        self.set_status(format!(
            "Renamed '{}' to '{}' ({} annotations)",
            old, name, updated
        ));
        Ok(())
    }

    fn reset_session(&mut self) -> Result<()> {
        let image = self.active_image()?;
        let before = self.store.active()?.annotations.clone();
        self.store.reset(ResetScope::Session)?;
        if !before.is_empty() {
            self.undo.push(Command::ReplaceAnnotations {
                image,
                before,
                after: Vec::new(),
                description: "Reset session".to_string(),
            });
        }
        self.hover = HoverState::default();
        self.set_status("Cleared all annotations on this image");
        Ok(())
    }

    fn undo(&mut self, undo: bool) -> Result<()> {
        let command = if undo {
            undo_command(&mut self.undo, &mut self.store)
        } else {
            redo_command(&mut self.undo, &mut self.store)
        };
        let Some(command) = command else {
            self.set_status(if undo { "Nothing to undo" } else { "Nothing to redo" });
            return Ok(());
        };

        // History entries carry the class name at the time they were recorded
        let image = command.image().to_path_buf();
        for annotation in &mut self.store.session_mut(&image).annotations {
            if let Some(name) = self.registry.name_of(annotation.class_id) {
                annotation.class_name = name.to_string();
            }
        }
        if let Ok(session) = self.store.active_mut() {
            session.candidates.clear();
        }
        self.hover = HoverState::default();
        self.set_status(format!(
            "{}: {}",
            if undo { "Undo" } else { "Redo" },
            command.description()
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    fn export(&mut self, dir: &Path, mode: Option<LabelMode>) -> Result<ExportResult> {
        let mode = mode.unwrap_or(self.config.preferences.label_mode);
        let sessions = self.store.sessions();
        let images: Vec<ImageLabels<'_>> = sessions
            .iter()
            .map(|(path, session)| ImageLabels {
                image_path: path,
                annotations: &session.annotations,
            })
            .collect();
        let options =
            ExportOptions::new(mode).write_overlays(self.config.preferences.write_overlays);
        let result = export_labels(dir, &images, self.registry.entries(), options)?;
        self.set_status(format!(
            "Exported {} images ({} {} labels) to {}",
            result.images_exported,
            result.annotations_exported,
            mode,
            dir.display()
        ));
        Ok(result)
    }

    /// Apply the crop rectangle to every folder image (or the active one).
    ///
    /// Each image is mapped through its own view, or a fresh fit if it has
    /// never been shown.
    fn crop_all(&mut self, dir: &Path) -> Result<ExportResult> {
        let rect = self
            .crop
            .rect
            .ok_or_else(|| Error::invalid_region("no crop rectangle drawn"))?;
        let images = match self.project.as_ref() {
            Some(project) => project.images.clone(),
            None => vec![self.active_image()?],
        };
        let result = crop::crop_images(&images, dir, |path| {
            let size = self.image_size_of(path)?;
            let view = self
                .store
                .session(path)
                .and_then(|s| s.view)
                .unwrap_or_else(|| ViewTransform::fit(self.canvas, size));
            rect.to_pixels(&view, size)
        })?;
        self.set_status(format!(
            "Cropped {} of {} images into {}",
            result.images_exported,
            images.len(),
            dir.display()
        ));
        Ok(result)
    }

    fn import(&mut self, dir: &Path) -> Result<Outcome> {
        let images = self
            .project
            .as_ref()
            .map(|p| p.images.clone())
            .ok_or(Error::NoActiveImage)?;
        let result = import_labels(dir, &images, |path| self.image_size_of(path))?;

        for (id, name) in &result.classes {
            self.registry.register_with_id(*id, name);
        }

        let image_count = result.images.len();
        let mut annotation_count = 0;
        for imported in result.images {
            let mut annotations = Vec::with_capacity(imported.labels.len());
            for (mask_id, (class_id, mask)) in imported.labels.into_iter().enumerate() {
                let class_name = self
                    .registry
                    .register_with_id(class_id, &format!("class{}", class_id))
                    .name
                    .clone();
                annotations.push(Annotation::new(mask_id as u32, mask, class_id, class_name));
            }
            annotation_count += annotations.len();

            let size = annotations.first().map(|a| a.mask.size());
            let session = self.store.session_mut(&imported.image_path);
            if session.image_size.is_none() {
                session.image_size = size;
            }
            let before = self
                .store
                .replace_annotations(&imported.image_path, annotations.clone());
            self.undo.push(Command::ReplaceAnnotations {
                image: imported.image_path,
                before,
                after: annotations,
                description: "Import labels".to_string(),
            });
        }

        self.hover = HoverState::default();
        self.set_status(format!(
            "Imported {} annotations from {}",
            annotation_count,
            dir.display()
        ));
        Ok(Outcome::Imported {
            images: image_count,
            annotations: annotation_count,
            warnings: result.warnings,
        })
    }
}
