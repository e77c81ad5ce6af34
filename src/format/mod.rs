//! Label import/export.
//!
//! - [`label`]: one line ⇄ one mask, in the segmentation (polygon) or
//!   detection (box) encoding
//! - [`contour`]: outer-boundary extraction used by the polygon encoding
//! - [`yolo`]: whole label directories with `classes.txt` and image matching
//! - [`overlay`]: `<stem>_segmented.png` previews
//! - [`crop`]: one screen rectangle cut from every image of a folder

pub mod contour;
pub mod crop;
pub mod label;
pub mod overlay;
mod report;
pub mod yolo;

#[cfg(test)]
mod tests;

pub use label::{
    DetectionLabel, LabelMode, LabelParseError, ParsedLabel, PolygonLabel, encode_detection,
    encode_segmentation, parse_line,
};
pub use report::{ExportResult, FormatWarning, ImportResult, ImportedImage, WarningSeverity};
pub use yolo::{ExportOptions, ImageLabels, export_labels, import_labels};
