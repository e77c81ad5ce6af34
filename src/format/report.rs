//! Outcome reports for batch label export and import.

use std::path::{Path, PathBuf};

/// Result of an export run.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of label files written.
    pub images_exported: usize,

    /// Number of label lines written.
    pub annotations_exported: usize,

    /// Skipped annotations and per-image failures.
    pub warnings: Vec<FormatWarning>,

    /// Files created during export.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if any image failed outright.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.warnings)
    }
}

/// Annotations parsed for one image during import.
#[derive(Debug, Clone)]
pub struct ImportedImage {
    /// Image the label file was matched to
    pub image_path: PathBuf,
    /// Label file the annotations came from
    pub label_path: PathBuf,
    /// `(class_id, mask)` per accepted line, in file order
    pub labels: Vec<(u32, crate::model::Mask)>,
}

/// Result of an import run.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// One entry per matched label file
    pub images: Vec<ImportedImage>,

    /// `(id, name)` pairs read from the class map, if present.
    pub classes: Vec<(u32, String)>,

    /// Skipped lines, unmatched files and unreadable images.
    pub warnings: Vec<FormatWarning>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Total annotations across all matched images.
    pub fn annotation_count(&self) -> usize {
        self.images.iter().map(|image| image.labels.len()).sum()
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.warnings)
    }
}

fn has_errors(warnings: &[FormatWarning]) -> bool {
    warnings
        .iter()
        .any(|w| matches!(w.severity, WarningSeverity::Error))
}

/// Warning generated during label conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// Image or label file this warning relates to (if applicable).
    pub path: Option<PathBuf>,

    /// Human-readable warning message.
    pub message: String,

    pub severity: WarningSeverity,
}

impl FormatWarning {
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            path: None,
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Error)
    }

    /// Attach the file this warning relates to.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }
}

impl std::fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{:?}] {:?}: {}", self.severity, path, self.message),
            None => write!(f, "[{:?}] {}", self.severity, self.message),
        }
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Something was skipped.
    Warning,
    /// An image could not be processed at all.
    Error,
}
