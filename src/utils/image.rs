//! Image loading, cropping and rotation.

use crate::core::OCRError;
use image::imageops;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `OCRError::ImageLoad` when the file cannot be opened or decoded.
pub fn load_image(path: &std::path::Path) -> Result<RgbImage, OCRError> {
    let img = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(img.to_rgb8())
}

/// Cuts the region given by relative `[xmin, ymin, xmax, ymax]` out of `image`.
///
/// Returns `None` when the region is empty after rounding to pixels.
pub fn crop_relative(image: &RgbImage, bbox: &[f32]) -> Option<RgbImage> {
    let [xmin, ymin, xmax, ymax] = <[f32; 4]>::try_from(bbox.get(..4)?).ok()?;
    let (w, h) = (image.width() as f32, image.height() as f32);
    let x0 = (xmin.clamp(0.0, 1.0) * w).round() as u32;
    let y0 = (ymin.clamp(0.0, 1.0) * h).round() as u32;
    let x1 = (xmax.clamp(0.0, 1.0) * w).round() as u32;
    let y1 = (ymax.clamp(0.0, 1.0) * h).round() as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Rotates `image` counter-clockwise by `angle` degrees.
///
/// The canvas grows to hold the whole rotated image and uncovered pixels are
/// black. Multiples of 90 degrees are rotated exactly.
pub fn rotate_image(image: &RgbImage, angle: f32) -> RgbImage {
    let normalized = angle.rem_euclid(360.0);
    let quarter = normalized / 90.0;
    if (quarter - quarter.round()).abs() < 1e-6 {
        // imageops::rotate90 turns clockwise.
        return match (quarter.round() as i32).rem_euclid(4) {
            0 => image.clone(),
            1 => imageops::rotate270(image),
            2 => imageops::rotate180(image),
            _ => imageops::rotate90(image),
        };
    }

    let theta = normalized.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (image.width() as f32, image.height() as f32);
    let new_w = (w * cos + h * sin).round().max(1.0);
    let new_h = (w * sin + h * cos).round().max(1.0);

    // A positive Projection::rotate turns clockwise on screen.
    let projection = Projection::translate(-w / 2.0, -h / 2.0)
        .and_then(Projection::rotate(-theta))
        .and_then(Projection::translate(new_w / 2.0, new_h / 2.0));

    let mut out = RgbImage::new(new_w as u32, new_h as u32);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    out
}
