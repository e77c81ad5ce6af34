//! Single label-line codec.
//!
//! Two normalized encodings share one file layout, one object per line:
//!
//! - **detection**: `class cx cy w h`
//! - **segmentation**: `class x1 y1 x2 y2 ... xn yn`
//!
//! All coordinates are divided by the image width/height and written with six
//! decimals. Parsing is two-staged: [`parse_line`] produces a typed
//! [`ParsedLabel`], and [`ParsedLabel::rasterize`] turns it into a [`Mask`].

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::contour::label_polygon;
use crate::model::{ImageSize, Mask};

/// Which encoding an export run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Simplified outer polygon per annotation
    #[default]
    Segmentation,
    /// Tight bounding box per annotation
    Detection,
}

impl LabelMode {
    /// Encode one mask as a label line, or None if nothing can be written for it.
    pub fn encode(&self, class_id: u32, mask: &Mask) -> Option<String> {
        match self {
            LabelMode::Segmentation => encode_segmentation(class_id, mask),
            LabelMode::Detection => encode_detection(class_id, mask),
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelMode::Segmentation => write!(f, "segmentation"),
            LabelMode::Detection => write!(f, "detection"),
        }
    }
}

impl FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "segmentation" | "seg" | "polygon" => Ok(LabelMode::Segmentation),
            "detection" | "det" | "box" | "bbox" => Ok(LabelMode::Detection),
            other => Err(format!("unknown label mode '{}'", other)),
        }
    }
}

/// Why a label line was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelParseError {
    #[error("expected at least 5 tokens, found {count}")]
    TooFewTokens { count: usize },

    #[error("class id '{token}' is not a non-negative integer")]
    InvalidClassId { token: String },

    #[error("coordinate '{token}' is not a number")]
    InvalidCoordinate { token: String },

    #[error("polygon needs at least 3 vertices, found {count}")]
    TooFewVertices { count: usize },
}

/// Normalized center/size box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionLabel {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
}

/// Normalized polygon vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonLabel {
    pub class_id: u32,
    pub vertices: Vec<(f64, f64)>,
}

/// A successfully parsed label line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLabel {
    Detection(DetectionLabel),
    Polygon(PolygonLabel),
}

impl ParsedLabel {
    pub fn class_id(&self) -> u32 {
        match self {
            ParsedLabel::Detection(label) => label.class_id,
            ParsedLabel::Polygon(label) => label.class_id,
        }
    }

    /// Fill the labelled region into a mask of the given image size.
    pub fn rasterize(&self, size: ImageSize) -> Mask {
        match self {
            ParsedLabel::Detection(label) => rasterize_detection(label, size),
            ParsedLabel::Polygon(label) => rasterize_polygon(label, size),
        }
    }
}

/// Parse one label line.
///
/// Exactly five tokens are read as a box; if any of those four floats fails to
/// parse the line is retried as a polygon. Any other length is a polygon, with a
/// trailing unpaired token ignored.
pub fn parse_line(line: &str) -> Result<ParsedLabel, LabelParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return Err(LabelParseError::TooFewTokens {
            count: tokens.len(),
        });
    }
    let class_id: u32 = tokens[0]
        .parse()
        .map_err(|_| LabelParseError::InvalidClassId {
            token: tokens[0].to_string(),
        })?;

    if tokens.len() == 5 {
        if let Ok(values) = parse_floats(&tokens[1..]) {
            return Ok(ParsedLabel::Detection(DetectionLabel {
                class_id,
                cx: values[0],
                cy: values[1],
                width: values[2],
                height: values[3],
            }));
        }
    }

    let values = parse_floats(&tokens[1..])?;
    let vertices: Vec<(f64, f64)> = values
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    if vertices.len() < 3 {
        return Err(LabelParseError::TooFewVertices {
            count: vertices.len(),
        });
    }
    Ok(ParsedLabel::Polygon(PolygonLabel { class_id, vertices }))
}

fn parse_floats(tokens: &[&str]) -> Result<Vec<f64>, LabelParseError> {
    tokens
        .iter()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LabelParseError::InvalidCoordinate {
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Normalized coordinate to pixel, truncating toward zero.
fn to_pixel(normalized: f64, extent: u32) -> i64 {
    (normalized * f64::from(extent)) as i64
}

fn rasterize_detection(label: &DetectionLabel, size: ImageSize) -> Mask {
    let mut mask = Mask::empty(size);
    let x0 = to_pixel(label.cx - label.width / 2.0, size.width);
    let y0 = to_pixel(label.cy - label.height / 2.0, size.height);
    let x1 = to_pixel(label.cx + label.width / 2.0, size.width);
    let y1 = to_pixel(label.cy + label.height / 2.0, size.height);
    mask.fill_rect(x0, y0, x1, y1);
    mask
}

fn rasterize_polygon(label: &PolygonLabel, size: ImageSize) -> Mask {
    if size.is_empty() {
        return Mask::empty(size);
    }
    let mut points: Vec<PixelPoint<i32>> = Vec::with_capacity(label.vertices.len());
    for &(x, y) in &label.vertices {
        let point = PixelPoint::new(
            clamp_i32(to_pixel(x, size.width)),
            clamp_i32(to_pixel(y, size.height)),
        );
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let mut canvas = GrayImage::new(size.width, size.height);
    let fill = Luma([255u8]);
    match points.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < size.width && (p.y as u32) < size.height {
                canvas.put_pixel(p.x as u32, p.y as u32, fill);
            }
        }
        [a, b] => draw_line_segment_mut(
            &mut canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            fill,
        ),
        _ => draw_polygon_mut(&mut canvas, &points, fill),
    }
    Mask::from_gray_image(&canvas)
}

/// Far-off vertices are pulled in so edge arithmetic stays well inside `i32`.
const MAX_VERTEX_PX: i64 = 1 << 20;

fn clamp_i32(v: i64) -> i32 {
    v.clamp(-MAX_VERTEX_PX, MAX_VERTEX_PX) as i32
}

/// `class x1 y1 ... xn yn` from the simplified outer contour of the mask.
pub fn encode_segmentation(class_id: u32, mask: &Mask) -> Option<String> {
    let size = mask.size();
    if size.is_empty() {
        return None;
    }
    let polygon = label_polygon(mask)?;
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let mut line = class_id.to_string();
    for point in polygon {
        line.push_str(&format!(" {:.6} {:.6}", f64::from(point.x) / w, f64::from(point.y) / h));
    }
    Some(line)
}

/// `class cx cy w h` from the inclusive extent of the set pixels.
pub fn encode_detection(class_id: u32, mask: &Mask) -> Option<String> {
    let size = mask.size();
    if size.is_empty() {
        return None;
    }
    let (x0, y0, x1, y1) = mask.extent()?;
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
    Some(format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        class_id,
        (x0 + x1) / (2.0 * w),
        (y0 + y1) / (2.0 * h),
        (x1 - x0) / w,
        (y1 - y0) / h
    ))
}
