//! Mask boundary extraction and simplification for polygon labels.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::constants::{CONTOUR_EPSILON_RATIO, MIN_CONTOUR_POINTS};
use crate::model::Mask;

/// Outer boundaries of the set regions, each reduced to its corner points.
///
/// Holes and regions nested inside holes are ignored. Straight runs of
/// boundary pixels collapse to their endpoints. Regions touching the image
/// border are traced along the border pixels.
pub fn outer_contours(mask: &Mask) -> Vec<Vec<Point<i32>>> {
    let framed = with_empty_frame(&mask.to_gray_image());
    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .map(|contour| {
            let points: Vec<Point<i32>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            compress_runs(&points)
        })
        .collect()
}

/// Copy of `gray` surrounded by a one-pixel background frame.
///
/// The contour tracer never starts a border on the outermost row or column.
fn with_empty_frame(gray: &GrayImage) -> GrayImage {
    let mut framed = GrayImage::new(gray.width() + 2, gray.height() + 2);
    for (x, y, pixel) in gray.enumerate_pixels() {
        framed.put_pixel(x + 1, y + 1, *pixel);
    }
    framed
}

/// Absolute area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    (twice as f64 / 2.0).abs()
}

/// The simplified polygon written for a mask, or None when the mask has no
/// outer boundary with enough points.
///
/// Picks the outer contour with the largest area, then applies Douglas-Peucker
/// with a tolerance proportional to the contour perimeter.
pub fn label_polygon(mask: &Mask) -> Option<Vec<Point<i32>>> {
    let contour = outer_contours(mask)
        .into_iter()
        .max_by(|a, b| polygon_area(a).total_cmp(&polygon_area(b)))?;
    if contour.len() < MIN_CONTOUR_POINTS {
        return None;
    }
    let epsilon = CONTOUR_EPSILON_RATIO * arc_length(&contour, true);
    Some(simplify_closed(&contour, epsilon))
}

/// Douglas-Peucker over a closed curve, split at the point farthest from the start.
fn simplify_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let start = points[0];
    let split = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let dx = i64::from(p.x - start.x);
            let dy = i64::from(p.y - start.y);
            dx * dx + dy * dy
        })
        .map(|(index, _)| index)
        .unwrap_or(0);
    if split == 0 {
        return vec![start];
    }

    let mut simplified = approximate_polygon_dp(&points[..=split], epsilon, false);
    let mut tail = points[split..].to_vec();
    tail.push(start);
    let second = approximate_polygon_dp(&tail, epsilon, false);

    simplified.pop();
    simplified.extend(second);
    simplified.pop();
    simplified
}

/// Drop boundary points that continue the previous step's direction.
fn compress_runs(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}
