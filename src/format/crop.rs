//! Batch cropping with one screen-space rectangle.
//!
//! The rectangle is drawn once on the canvas and mapped through each image's
//! own view, so the same on-screen region is cut from every image of a folder.
//! Rectangles can be saved per image as `<stem>_coords.txt` (`x0,y0,x1,y1`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::format::report::{ExportResult, FormatWarning};
use crate::model::{ImageSize, PixelRect};
use crate::view_transform::ViewTransform;

/// Suffix of cropped output files, before the extension
pub const CROP_SUFFIX: &str = "_crop";

/// Suffix of saved rectangle files
pub const COORDS_SUFFIX: &str = "_coords.txt";

/// A crop rectangle in screen (canvas) pixels, `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl CropRect {
    /// Rectangle spanned by two drag corners in any order.
    pub fn from_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    /// Image pixels under the rectangle, truncated and clamped to the image.
    ///
    /// Fails with `InvalidRegion` when nothing of the image is left.
    pub fn to_pixels(&self, view: &ViewTransform, image: ImageSize) -> Result<PixelRect> {
        let to_px = |screen: f32, offset: f32, max: u32| -> u32 {
            let v = ((screen - offset) / view.scale) as i64;
            v.clamp(0, i64::from(max)) as u32
        };
        let rect = PixelRect::new(
            to_px(self.x0, view.offset_x, image.width),
            to_px(self.y0, view.offset_y, image.height),
            to_px(self.x1, view.offset_x, image.width),
            to_px(self.y1, view.offset_y, image.height),
        );
        if rect.is_empty() {
            return Err(Error::invalid_region(format!(
                "crop ({}, {})-({}, {}) is empty on a {}x{} image",
                rect.x0, rect.y0, rect.x1, rect.y1, image.width, image.height
            )));
        }
        Ok(rect)
    }

    /// Parse the `x0,y0,x1,y1` coordinate file format.
    pub fn parse(text: &str) -> Option<Self> {
        let values: Vec<f32> = text
            .trim()
            .split(',')
            .map(|v| v.trim().parse().ok())
            .collect::<Option<_>>()?;
        match values.as_slice() {
            &[x0, y0, x1, y1] => Some(Self::from_corners(x0, y0, x1, y1)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CropRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Rectangle being drawn or applied, and whether it may change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CropState {
    pub rect: Option<CropRect>,
    pub locked: bool,
}

impl CropState {
    /// Replace the rectangle. Returns false (and changes nothing) when locked.
    pub fn set(&mut self, rect: CropRect) -> bool {
        if self.locked {
            return false;
        }
        self.rect = Some(rect);
        true
    }

    /// Drop the rectangle. Returns false when locked.
    pub fn clear(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.rect = None;
        true
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<stem>_coords.txt` for an image.
pub fn coords_path(dir: &Path, image_path: &Path) -> PathBuf {
    dir.join(format!("{}{}", stem(image_path), COORDS_SUFFIX))
}

/// `<dir>/<stem>_crop.<ext>` with the extension lowercased.
pub fn crop_output_path(dir: &Path, image_path: &Path) -> PathBuf {
    let ext = image_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    dir.join(format!("{}{}{}", stem(image_path), CROP_SUFFIX, ext))
}

/// Write the rectangle for an image, creating `dir` if needed.
pub fn save_coords(dir: &Path, image_path: &Path, rect: &CropRect) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::export_io(dir, e))?;
    let path = coords_path(dir, image_path);
    fs::write(&path, rect.to_string()).map_err(|e| Error::export_io(&path, e))?;
    log::info!("Saved crop {} to {:?}", rect, path);
    Ok(path)
}

/// Read the rectangle saved for an image.
pub fn load_coords(dir: &Path, image_path: &Path) -> Result<CropRect> {
    let path = coords_path(dir, image_path);
    let text = fs::read_to_string(&path)?;
    CropRect::parse(&text).ok_or_else(|| Error::ImportParse {
        path,
        line: 1,
        message: "expected four comma-separated numbers".to_string(),
    })
}

/// Cut `rect` out of an image and save it into `out_dir`.
pub fn crop_image(image_path: &Path, rect: PixelRect, out_dir: &Path) -> Result<PathBuf> {
    if rect.is_empty() {
        return Err(Error::invalid_region("empty crop rectangle"));
    }
    let image = image::open(image_path)?;
    if rect.x1 > image.width() || rect.y1 > image.height() {
        return Err(Error::invalid_region(format!(
            "crop ({}, {})-({}, {}) exceeds {}x{}",
            rect.x0,
            rect.y0,
            rect.x1,
            rect.y1,
            image.width(),
            image.height()
        )));
    }
    let cropped = image.crop_imm(rect.x0, rect.y0, rect.x1 - rect.x0, rect.y1 - rect.y0);

    fs::create_dir_all(out_dir).map_err(|e| Error::export_io(out_dir, e))?;
    let out_path = crop_output_path(out_dir, image_path);
    cropped.save(&out_path)?;
    log::debug!(
        "Cropped {:?} to {}x{} -> {:?}",
        image_path,
        cropped.width(),
        cropped.height(),
        out_path
    );
    Ok(out_path)
}

/// Crop every image, asking `region` for its pixel rectangle.
///
/// Per-image failures become warnings. Fails only if `out_dir` cannot be created.
pub fn crop_images<F>(images: &[PathBuf], out_dir: &Path, mut region: F) -> Result<ExportResult>
where
    F: FnMut(&Path) -> Result<PixelRect>,
{
    fs::create_dir_all(out_dir).map_err(|e| Error::export_io(out_dir, e))?;
    let mut result = ExportResult::new();
    for image_path in images {
        let cropped = region(image_path).and_then(|rect| crop_image(image_path, rect, out_dir));
        match cropped {
            Ok(path) => {
                result.files_created.push(path);
                result.images_exported += 1;
            }
            Err(e) => result.add_warning(FormatWarning::error(e.to_string()).with_path(image_path)),
        }
    }
    log::info!(
        "Cropped {} of {} images into {:?}",
        result.images_exported,
        images.len(),
        out_dir
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_corners_are_normalized() {
        assert_eq!(
            CropRect::from_corners(50.0, 10.0, 5.0, 40.0),
            CropRect {
                x0: 5.0,
                y0: 10.0,
                x1: 50.0,
                y1: 40.0
            }
        );
    }

    #[test]
    fn test_to_pixels_maps_through_view() {
        let image = ImageSize::new(100, 80);
        let rect = CropRect::from_corners(30.0, 30.0, 110.0, 110.0);
        let view = ViewTransform::new(2.0, 10.0, 10.0);
        assert_eq!(
            rect.to_pixels(&view, image).unwrap(),
            PixelRect::new(10, 10, 50, 50)
        );

        // Parts outside the image are clamped away
        let wide = CropRect::from_corners(-40.0, -5.0, 500.0, 20.5);
        assert_eq!(
            wide.to_pixels(&ViewTransform::identity(), image).unwrap(),
            PixelRect::new(0, 0, 100, 20)
        );
    }

    #[test]
    fn test_degenerate_rectangles_are_invalid() {
        let image = ImageSize::new(100, 80);
        let view = ViewTransform::identity();
        for rect in [
            CropRect::from_corners(10.0, 10.0, 10.0, 50.0),
            CropRect::from_corners(10.0, 10.0, 10.9, 50.0),
            CropRect::from_corners(200.0, 10.0, 300.0, 50.0),
        ] {
            assert!(matches!(
                rect.to_pixels(&view, image),
                Err(Error::InvalidRegion { .. })
            ));
        }
    }

    #[test]
    fn test_coords_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = Path::new("/photos/IMG_01.JPG");
        let rect = CropRect::from_corners(10.0, 20.5, 300.0, 400.0);

        let path = save_coords(dir.path(), image, &rect).unwrap();
        assert_eq!(path, dir.path().join("IMG_01_coords.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "10,20.5,300,400");
        assert_eq!(load_coords(dir.path(), image).unwrap(), rect);

        fs::write(&path, "1,2,3").unwrap();
        assert!(matches!(
            load_coords(dir.path(), image),
            Err(Error::ImportParse { .. })
        ));
        assert!(load_coords(dir.path(), Path::new("missing.png")).is_err());
    }

    #[test]
    fn test_crop_image_writes_lowercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Photo.PNG");
        RgbImage::from_pixel(20, 10, Rgb([9, 9, 9]))
            .save_with_format(&src, image::ImageFormat::Png)
            .unwrap();
        let out = dir.path().join("cropped");

        let path = crop_image(&src, PixelRect::new(2, 3, 12, 8), &out).unwrap();
        assert_eq!(path, out.join("Photo_crop.png"));
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (10, 5));

        assert!(matches!(
            crop_image(&src, PixelRect::new(2, 3, 30, 8), &out),
            Err(Error::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_batch_reports_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::new(10, 10).save(&a).unwrap();
        RgbImage::new(10, 10).save(&b).unwrap();
        let out = dir.path().join("out");

        let result = crop_images(&[a.clone(), b], &out, |path| {
            if path == a {
                Ok(PixelRect::new(0, 0, 5, 5))
            } else {
                Err(Error::invalid_region("empty"))
            }
        })
        .unwrap();

        assert_eq!(result.images_exported, 1);
        assert_eq!(result.files_created, vec![out.join("a_crop.png")]);
        assert!(result.has_errors());
    }

    #[test]
    fn test_lock_guards_the_rectangle() {
        let mut state = CropState::default();
        let rect = CropRect::from_corners(0.0, 0.0, 5.0, 5.0);
        assert!(state.set(rect));
        assert!(state.toggle_lock());
        assert!(!state.clear());
        assert!(!state.set(CropRect::from_corners(1.0, 1.0, 2.0, 2.0)));
        assert_eq!(state.rect, Some(rect));
        assert!(!state.toggle_lock());
        assert!(state.clear());
        assert_eq!(state.rect, None);
    }
}
