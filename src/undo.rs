//! Undo/redo for committed annotations.
//!
//! Each undoable action is recorded as a [`Command`] after it has been applied.
//! Undoing or redoing re-applies it to the [`AnnotationStore`]; pending points
//! are not part of the history.

use std::path::{Path, PathBuf};

use crate::model::Annotation;
use crate::state::AnnotationStore;

// ============================================================================
// Command Types
// ============================================================================

/// A reversible change to one image's annotation list.
#[derive(Debug, Clone)]
pub enum Command {
    /// An annotation was committed
    AddAnnotation {
        image: PathBuf,
        index: usize,
        annotation: Annotation,
    },
    /// An annotation was deleted
    RemoveAnnotation {
        image: PathBuf,
        index: usize,
        annotation: Annotation,
    },
    /// The whole list was swapped (label import, session reset)
    ReplaceAnnotations {
        image: PathBuf,
        before: Vec<Annotation>,
        after: Vec<Annotation>,
        description: String,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::AddAnnotation { annotation, .. } => {
                format!("Commit '{}'", annotation.class_name)
            }
            Command::RemoveAnnotation { annotation, .. } => {
                format!("Delete '{}'", annotation.class_name)
            }
            Command::ReplaceAnnotations { description, .. } => description.clone(),
        }
    }

    /// Image the command applies to.
    pub fn image(&self) -> &Path {
        match self {
            Command::AddAnnotation { image, .. }
            | Command::RemoveAnnotation { image, .. }
            | Command::ReplaceAnnotations { image, .. } => image,
        }
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

/// Undo and redo stacks, most recent command last.
///
/// Pushing a new command clears the redo stack.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    config: UndoConfig,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record an action that has already been applied.
    pub fn push(&mut self, command: Command) {
        log::debug!("Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.config.max_history {
            let excess = self.undo_stack.len() - self.config.max_history;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Move the newest command to the redo stack and return it.
    pub fn pop_undo(&mut self) -> Option<Command> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Move the newest undone command back to the undo stack and return it.
    pub fn pop_redo(&mut self) -> Option<Command> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("Redo: '{}'", cmd.description());
        self.undo_stack.push(cmd.clone());
        Some(cmd)
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

/// Undo the newest command. Returns it, or None if there was nothing to undo.
pub fn undo_command(stack: &mut UndoStack, store: &mut AnnotationStore) -> Option<Command> {
    let cmd = stack.pop_undo()?;
    apply(&cmd, store, Direction::Undo);
    Some(cmd)
}

/// Redo the newest undone command.
pub fn redo_command(stack: &mut UndoStack, store: &mut AnnotationStore) -> Option<Command> {
    let cmd = stack.pop_redo()?;
    apply(&cmd, store, Direction::Redo);
    Some(cmd)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

fn apply(cmd: &Command, store: &mut AnnotationStore, direction: Direction) {
    match (cmd, direction) {
        (
            Command::AddAnnotation {
                image, annotation, ..
            },
            Direction::Undo,
        )
        | (
            Command::RemoveAnnotation {
                image, annotation, ..
            },
            Direction::Redo,
        ) => remove_by_mask_id(store, image, annotation),
        (
            Command::AddAnnotation {
                image,
                index,
                annotation,
            },
            Direction::Redo,
        )
        | (
            Command::RemoveAnnotation {
                image,
                index,
                annotation,
            },
            Direction::Undo,
        ) => store.restore_annotation(image, *index, annotation.clone()),
        (Command::ReplaceAnnotations { image, before, .. }, Direction::Undo) => {
            store.replace_annotations(image, before.clone());
        }
        (Command::ReplaceAnnotations { image, after, .. }, Direction::Redo) => {
            store.replace_annotations(image, after.clone());
        }
    }
}

fn remove_by_mask_id(store: &mut AnnotationStore, image: &Path, annotation: &Annotation) {
    let position = store.session(image).and_then(|session| {
        session
            .annotations
            .iter()
            .position(|a| a.mask_id == annotation.mask_id)
    });
    match position {
        Some(index) => {
            if let Err(e) = store.remove_annotation_at(image, index) {
                log::warn!("Undo could not remove annotation: {}", e);
            }
        }
        None => log::warn!(
            "Undo: mask {} no longer present on {:?}",
            annotation.mask_id,
            image
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageSize, Mask};

    fn annotation(mask_id: u32, class_name: &str) -> Annotation {
        let mut mask = Mask::empty(ImageSize::new(10, 10));
        mask.fill_rect(1, 1, 4, 4);
        Annotation::new(mask_id, mask, 0, class_name)
    }

    fn names(store: &AnnotationStore, image: &Path) -> Vec<String> {
        store
            .session(image)
            .map(|s| s.annotations.iter().map(|a| a.class_name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_undo_redo_add() {
        let image = PathBuf::from("a.png");
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();

        let ann = annotation(0, "cat");
        store.restore_annotation(&image, 0, ann.clone());
        stack.push(Command::AddAnnotation {
            image: image.clone(),
            index: 0,
            annotation: ann,
        });

        assert!(undo_command(&mut stack, &mut store).is_some());
        assert!(names(&store, &image).is_empty());
        assert!(stack.can_redo());

        assert!(redo_command(&mut stack, &mut store).is_some());
        assert_eq!(names(&store, &image), vec!["cat"]);
    }

    #[test]
    fn test_undo_remove_restores_position() {
        let image = PathBuf::from("a.png");
        let mut store = AnnotationStore::new();
        store.replace_annotations(
            &image,
            vec![annotation(0, "a"), annotation(1, "b"), annotation(2, "c")],
        );
        let mut stack = UndoStack::new();

        let removed = store.remove_annotation_at(&image, 1).unwrap();
        stack.push(Command::RemoveAnnotation {
            image: image.clone(),
            index: 1,
            annotation: removed,
        });
        assert_eq!(names(&store, &image), vec!["a", "c"]);

        undo_command(&mut stack, &mut store);
        assert_eq!(names(&store, &image), vec!["a", "b", "c"]);
        redo_command(&mut stack, &mut store);
        assert_eq!(names(&store, &image), vec!["a", "c"]);
    }

    #[test]
    fn test_undo_replace() {
        let image = PathBuf::from("a.png");
        let mut store = AnnotationStore::new();
        let before = vec![annotation(0, "old")];
        let after = vec![annotation(0, "new1"), annotation(1, "new2")];
        store.replace_annotations(&image, after.clone());
        let mut stack = UndoStack::new();
        stack.push(Command::ReplaceAnnotations {
            image: image.clone(),
            before,
            after,
            description: "Import labels".into(),
        });

        undo_command(&mut stack, &mut store);
        assert_eq!(names(&store, &image), vec!["old"]);
        redo_command(&mut stack, &mut store);
        assert_eq!(names(&store, &image), vec!["new1", "new2"]);
    }

    #[test]
    fn test_push_clears_redo_and_caps_history() {
        let mut stack = UndoStack::with_config(UndoConfig { max_history: 2 });
        let mut store = AnnotationStore::new();
        for i in 0..3 {
            stack.push(Command::ReplaceAnnotations {
                image: PathBuf::from("a.png"),
                before: Vec::new(),
                after: Vec::new(),
                description: format!("step {}", i),
            });
        }
        assert_eq!(stack.undo_count(), 2);
        assert_eq!(stack.undo_description().as_deref(), Some("step 2"));

        undo_command(&mut stack, &mut store);
        assert_eq!(stack.redo_count(), 1);
        stack.push(Command::ReplaceAnnotations {
            image: PathBuf::from("a.png"),
            before: Vec::new(),
            after: Vec::new(),
            description: "step 3".into(),
        });
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_empty_stacks() {
        let mut stack = UndoStack::new();
        let mut store = AnnotationStore::new();
        assert!(undo_command(&mut stack, &mut store).is_none());
        assert!(redo_command(&mut stack, &mut store).is_none());
    }
}
