//! Image folder listing and navigation.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif", "webp",
];

/// Check if a path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted image list of one folder plus the current position.
#[derive(Clone, Debug)]
pub struct ProjectState {
    /// Folder the images were listed from
    pub folder: PathBuf,
    /// Image files, sorted by path
    pub images: Vec<PathBuf>,
    /// Index of the displayed image
    pub current_index: usize,
}

impl ProjectState {
    /// List the images directly inside `folder` (non-recursive).
    pub fn from_folder(folder: &Path) -> Result<Self> {
        let images = list_images(folder)?;
        if images.is_empty() {
            return Err(Error::EmptyFolder {
                path: folder.to_path_buf(),
            });
        }
        log::info!("Opened folder {:?}: {} images", folder, images.len());
        Ok(Self {
            folder: folder.to_path_buf(),
            images,
            current_index: 0,
        })
    }

    /// Get the current image path.
    pub fn current_image(&self) -> Option<&Path> {
        self.images.get(self.current_index).map(PathBuf::as_path)
    }

    /// File name of the current image for status text.
    pub fn current_name(&self) -> String {
        self.current_image()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .map(String::from)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Index of `path` in the listing.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.images.iter().position(|p| p == path)
    }

    /// Jump to a listed image. Returns false if it is not part of the folder.
    pub fn select(&mut self, path: &Path) -> bool {
        match self.index_of(path) {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    /// Move to the next image. Stays put (and returns false) at the end.
    pub fn next(&mut self) -> bool {
        if self.current_index + 1 < self.images.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous image. Stays put (and returns false) at the start.
    pub fn prev(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    /// Get progress string like "3/15".
    pub fn progress(&self) -> String {
        format!("{}/{}", self.current_index + 1, self.images.len())
    }
}

/// Sorted list of image files directly inside `folder`.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    images.sort();
    Ok(images)
}
