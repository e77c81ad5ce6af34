//! Preview images with committed masks blended over the source image.

use std::path::Path;

use image::RgbImage;

use crate::color_utils::palette_rgb;
use crate::constants::OVERLAY_ALPHA;
use crate::error::Result;
use crate::model::Annotation;

/// Add each annotation's palette color (by list position) onto the covered pixels.
///
/// Colors are added with saturation, so overlapping masks brighten. Masks whose
/// size differs from the image are sampled nearest-neighbour.
pub fn render_overlay(base: &RgbImage, annotations: &[Annotation]) -> RgbImage {
    let mut out = base.clone();
    let (width, height) = out.dimensions();
    for (index, annotation) in annotations.iter().enumerate() {
        let (r, g, b) = palette_rgb(index as u32);
        let add = [r, g, b].map(|c| (c * 255.0 * OVERLAY_ALPHA).round() as u8);
        let (mask_w, mask_h) = (annotation.mask.width(), annotation.mask.height());
        if mask_w == 0 || mask_h == 0 {
            continue;
        }
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let mx = (u64::from(x) * u64::from(mask_w) / u64::from(width)) as u32;
            let my = (u64::from(y) * u64::from(mask_h) / u64::from(height)) as u32;
            if annotation.mask.is_set(mx, my) {
                for (channel, delta) in pixel.0.iter_mut().zip(add) {
                    *channel = channel.saturating_add(delta);
                }
            }
        }
    }
    out
}

/// Load `image_path`, draw the overlay and save it as PNG to `out_path`.
pub fn write_overlay(image_path: &Path, annotations: &[Annotation], out_path: &Path) -> Result<()> {
    let base = image::open(image_path)?.to_rgb8();
    let overlay = render_overlay(&base, annotations);
    overlay.save(out_path)?;
    log::debug!("Wrote overlay {:?}", out_path);
    Ok(())
}
