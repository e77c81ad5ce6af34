//! YOLO label directories.
//!
//! One `<stem>.txt` per annotated image plus a `classes.txt` class map.
//! Export and import never abort on a single bad image: problems are collected
//! as [`FormatWarning`]s on the returned report.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CLASSES_FILENAME, OVERLAY_SUFFIX};
use crate::error::{Error, Result};
use crate::format::label::{LabelMode, parse_line};
use crate::format::overlay::write_overlay;
use crate::format::report::{ExportResult, FormatWarning, ImportResult, ImportedImage};
use crate::model::{Annotation, ClassEntry, ImageSize};

/// Options for an export run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Label encoding to write
    pub mode: LabelMode,
    /// Also write `<stem>_segmented.png` previews
    pub write_overlays: bool,
}

impl ExportOptions {
    pub fn new(mode: LabelMode) -> Self {
        Self {
            mode,
            write_overlays: false,
        }
    }

    pub fn write_overlays(mut self, enabled: bool) -> Self {
        self.write_overlays = enabled;
        self
    }
}

/// Committed annotations of one image, as handed to the exporter.
#[derive(Debug, Clone, Copy)]
pub struct ImageLabels<'a> {
    pub image_path: &'a Path,
    pub annotations: &'a [Annotation],
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Write label files for every image that has annotations, then the class map.
///
/// Fails only if the output directory cannot be created.
pub fn export_labels(
    output_dir: &Path,
    images: &[ImageLabels<'_>],
    classes: &[ClassEntry],
    options: ExportOptions,
) -> Result<ExportResult> {
    log::info!(
        "Exporting {} labels to {:?}",
        options.mode,
        output_dir
    );
    fs::create_dir_all(output_dir).map_err(|e| Error::export_io(output_dir, e))?;

    let mut result = ExportResult::new();

    for image in images.iter().filter(|image| !image.annotations.is_empty()) {
        let stem = file_stem(image.image_path);
        let txt_path = output_dir.join(format!("{}.txt", stem));

        let mut content = String::new();
        let mut written = 0;
        for (index, annotation) in image.annotations.iter().enumerate() {
            match options.mode.encode(annotation.class_id, &annotation.mask) {
                Some(line) => {
                    content.push_str(&line);
                    content.push('\n');
                    written += 1;
                }
                None => result.add_warning(
                    FormatWarning::warning(format!(
                        "Skipped annotation {} ('{}'): no exportable region",
                        index, annotation.class_name
                    ))
                    .with_path(image.image_path),
                ),
            }
        }

        if let Err(e) = fs::write(&txt_path, content) {
            result.add_warning(
                FormatWarning::error(Error::export_io(&txt_path, e).to_string())
                    .with_path(image.image_path),
            );
            continue;
        }
        result.files_created.push(txt_path);
        result.images_exported += 1;
        result.annotations_exported += written;

        if options.write_overlays {
            let overlay_path = output_dir.join(format!("{}{}", stem, OVERLAY_SUFFIX));
            match write_overlay(image.image_path, image.annotations, &overlay_path) {
                Ok(()) => result.files_created.push(overlay_path),
                Err(e) => result.add_warning(
                    FormatWarning::warning(format!("Overlay not written: {}", e))
                        .with_path(image.image_path),
                ),
            }
        }
    }

    if !classes.is_empty() {
        let classes_path = output_dir.join(CLASSES_FILENAME);
        let content: String = classes
            .iter()
            .map(|class| format!("{} {}\n", class.id, class.name))
            .collect();
        fs::write(&classes_path, content).map_err(|e| Error::export_io(&classes_path, e))?;
        result.files_created.push(classes_path);
    }

    log::info!(
        "Exported {} images with {} annotations ({} warnings)",
        result.images_exported,
        result.annotations_exported,
        result.warnings.len()
    );
    Ok(result)
}

/// Parse a class map. Lines are `id name`; a line without a leading integer
/// takes its line number as the id.
pub fn parse_classes(content: &str) -> Vec<(u32, String)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match line.split_once(char::is_whitespace) {
                Some((id, name)) if id.parse::<u32>().is_ok() && !name.trim().is_empty() => {
                    Some((id.parse().ok()?, name.trim().to_string()))
                }
                _ => Some((index as u32, line.to_string())),
            }
        })
        .collect()
}

/// Label files in `dir` (sorted), excluding the class map.
fn list_label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !name.eq_ignore_ascii_case(CLASSES_FILENAME))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Pair label files with images: same stem first, then the leftovers of both
/// lists in order. Returns `(label, image)` pairs and the unpaired labels.
pub fn match_labels_to_images(
    labels: &[PathBuf],
    images: &[PathBuf],
) -> (Vec<(PathBuf, PathBuf)>, Vec<PathBuf>) {
    let mut by_stem: HashMap<String, usize> = HashMap::new();
    for (index, image) in images.iter().enumerate() {
        by_stem.entry(file_stem(image)).or_insert(index);
    }

    let mut image_taken = vec![false; images.len()];
    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();
    for label in labels {
        match by_stem.get(&file_stem(label)) {
            Some(&index) if !image_taken[index] => {
                image_taken[index] = true;
                pairs.push((label.clone(), images[index].clone()));
            }
            _ => unmatched.push(label.clone()),
        }
    }

    let mut free_images = images
        .iter()
        .zip(&image_taken)
        .filter(|(_, taken)| !**taken)
        .map(|(image, _)| image);
    let mut leftover = Vec::new();
    for label in unmatched {
        match free_images.next() {
            Some(image) => {
                log::debug!("Paired {:?} with {:?} by position", label, image);
                pairs.push((label, image.clone()));
            }
            None => leftover.push(label),
        }
    }
    (pairs, leftover)
}

/// Read every label file in `label_dir` and rasterize it against its image.
///
/// `image_size` supplies the pixel dimensions of a matched image; a failure
/// there skips that image with a warning.
pub fn import_labels<F>(label_dir: &Path, images: &[PathBuf], mut image_size: F) -> Result<ImportResult>
where
    F: FnMut(&Path) -> Result<ImageSize>,
{
    log::info!("Importing labels from {:?}", label_dir);
    if !label_dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("label directory {:?} does not exist", label_dir),
        )));
    }

    let mut result = ImportResult::new();

    let classes_path = label_dir.join(CLASSES_FILENAME);
    if classes_path.is_file() {
        match fs::read_to_string(&classes_path) {
            Ok(content) => result.classes = parse_classes(&content),
            Err(e) => result.add_warning(
                FormatWarning::warning(format!("Class map unreadable: {}", e)).with_path(&classes_path),
            ),
        }
    }

    let label_files = list_label_files(label_dir)?;
    let (pairs, leftover) = match_labels_to_images(&label_files, images);
    for label in leftover {
        result.add_warning(FormatWarning::info("No image left to pair with").with_path(label));
    }

    for (label_path, image_path) in pairs {
        let size = match image_size(&image_path) {
            Ok(size) => size,
            Err(e) => {
                result.add_warning(
                    FormatWarning::error(format!("Image size unavailable: {}", e))
                        .with_path(&image_path),
                );
                continue;
            }
        };
        let content = match fs::read_to_string(&label_path) {
            Ok(content) => content,
            Err(e) => {
                result.add_warning(FormatWarning::error(e.to_string()).with_path(&label_path));
                continue;
            }
        };

        let mut labels = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(parsed) => labels.push((parsed.class_id(), parsed.rasterize(size))),
                Err(e) => result.add_warning(FormatWarning::warning(
                    Error::ImportParse {
                        path: label_path.clone(),
                        line: index + 1,
                        message: e.to_string(),
                    }
                    .to_string(),
                )),
            }
        }

        log::debug!(
            "{:?} -> {:?}: {} labels",
            label_path,
            image_path,
            labels.len()
        );
        result.images.push(ImportedImage {
            image_path,
            label_path,
            labels,
        });
    }

    log::info!(
        "Imported {} label files with {} annotations ({} warnings)",
        result.images.len(),
        result.annotation_count(),
        result.warnings.len()
    );
    Ok(result)
}
