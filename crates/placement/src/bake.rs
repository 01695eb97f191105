//! Logo compositing for texture baking.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use nalgebra::Point2;

use crate::config::DecalConfig;
use crate::types::PlacementError;

/// White canvas used when the target material has no map.
pub fn blank_canvas(size: u32) -> RgbaImage {
    RgbaImage::from_pixel(size.max(1), size.max(1), Rgba([255, 255, 255, 255]))
}

/// Pixel size of the logo painted into a `canvas_width` x `canvas_height` texture.
///
/// The edge is a share of the canvas's short side, never below the configured
/// minimum; the height follows the logo's aspect ratio.
pub fn logo_pixel_size(
    canvas_width: u32,
    canvas_height: u32,
    logo_width: u32,
    logo_height: u32,
    size_factor: f64,
    config: &DecalConfig,
) -> (u32, u32) {
    let short_side = canvas_width.min(canvas_height) as f64;
    let share = (config.bake_scale * size_factor).min(1.0);
    let width = ((short_side * share).floor() as u32).max(config.min_logo_pixels);
    let height = ((width as f64 * logo_height as f64 / logo_width.max(1) as f64).floor() as u32)
        .max(1);
    (width, height)
}

/// Paint `logo` onto a copy of `base`, centered on the texel addressed by `uv`.
///
/// UV `v` runs bottom-up while image rows run top-down. Parts of the logo
/// falling outside the canvas are cropped.
pub fn composite_logo(
    base: &RgbaImage,
    logo: &RgbaImage,
    uv: &Point2<f64>,
    size_factor: f64,
    config: &DecalConfig,
) -> Result<RgbaImage, PlacementError> {
    if logo.width() == 0 || logo.height() == 0 {
        return Err(PlacementError::EmptyLogo {
            width: logo.width(),
            height: logo.height(),
        });
    }
    let (w, h) = (base.width(), base.height());
    let (lw, lh) = logo_pixel_size(w, h, logo.width(), logo.height(), size_factor, config);
    let resized = imageops::resize(logo, lw, lh, FilterType::Triangle);

    let px = uv.x * w as f64;
    let py = (1.0 - uv.y) * h as f64;
    let left = (px - lw as f64 / 2.0).round() as i64;
    let top = (py - lh as f64 / 2.0).round() as i64;

    let mut canvas = base.clone();
    imageops::overlay(&mut canvas, &resized, left, top);
    Ok(canvas)
}
