//! Session messages.
//!
//! Every user action is a [`Message`] handed to
//! [`SessionController::dispatch`](crate::controller::SessionController::dispatch).
//! Positions are screen (canvas) pixels unless noted.

use std::path::PathBuf;

use crate::format::LabelMode;
use crate::model::Polarity;
use crate::view_transform::ZoomDirection;

/// Messages that can be sent to update session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Navigation
    /// Open an image folder and show its first image
    OpenFolder(PathBuf),
    /// Show a specific image
    SwitchImage(PathBuf),
    /// Navigate to next image (no wrap)
    NextImage,
    /// Navigate to previous image (no wrap)
    PrevImage,

    // Canvas
    /// Canvas was resized
    Resize { width: u32, height: u32 },
    /// Zoom one step around the cursor
    Zoom {
        x: f32,
        y: f32,
        direction: ZoomDirection,
    },
    /// Pan by a screen delta
    Pan { dx: f32, dy: f32 },
    /// Pointer moved; refreshes hover state
    PointerMoved { x: f32, y: f32 },

    // Prompting
    /// Primary click: place a prompt point
    AddPoint { x: f32, y: f32, polarity: Polarity },
    /// Remove the hovered point, else the last one
    RemovePoint,
    /// Secondary click: remove hovered annotation, else a point
    SecondaryClick { x: f32, y: f32 },
    /// Ask the oracle for candidate masks
    Segment,

    // Annotations
    /// Commit the top candidate under a class name
    Commit { class_name: String },
    /// Remove an annotation by index, or the hovered one
    RemoveAnnotation(Option<usize>),
    /// Rename a class everywhere
    RenameClass { old: String, new: String },
    /// Clear points and candidates
    Reset,
    /// Also clear committed annotations
    ResetSession,
    /// Undo last annotation change
    Undo,
    /// Redo previously undone change
    Redo,

    // Cropping
    /// Set the crop rectangle from two screen corners (ignored while locked)
    SetCrop { x0: f32, y0: f32, x1: f32, y1: f32 },
    /// Drop the crop rectangle (ignored while locked)
    ClearCrop,
    /// Lock or unlock the crop rectangle
    ToggleCropLock,
    /// Crop every image of the open folder into `dir`
    CropAll { dir: PathBuf },
    /// Save the rectangle as `<stem>_coords.txt` for the active image
    SaveCrop { dir: PathBuf },
    /// Load the rectangle saved for the active image
    LoadCrop { dir: PathBuf },

    // Files
    /// Write labels for every annotated image
    Export {
        dir: PathBuf,
        mode: Option<LabelMode>,
    },
    /// Load labels for the open folder
    Import { dir: PathBuf },
}
