//! Page skew estimation from the direction of text lines.
//!
//! Text is smeared into line-shaped blobs (blur, inverted Otsu threshold,
//! dilation with a page-proportional rectangle); the most elongated blobs are
//! taken as text lines and their directions voted on.

use crate::processors::geometry::Polygon;
use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::filter::median_filter;
use imageproc::morphology::{Mask, grayscale_dilate};

/// Default number of contours that take part in the vote.
pub const DEFAULT_NUMBER_CONTOURS: usize = 50;
/// Default elongation above which a contour counts as a text line.
pub const DEFAULT_RATIO_THRESHOLD_FOR_LINES: f32 = 5.0;

/// Estimates the counter-clockwise rotation, in whole degrees, that levels the text.
///
/// Only the `n_ct` most elongated contours are considered, and of those only
/// the ones whose minimum-area rectangle is more than
/// `ratio_threshold_for_lines` times longer than wide. Returns `0.0` when no
/// such line exists.
pub fn estimate_orientation(image: &RgbImage, n_ct: usize, ratio_threshold_for_lines: f32) -> f32 {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }

    let gray = imageops::grayscale(image);
    let blurred = median_filter(&gray, 2, 2);
    let level = otsu_level(&blurred);
    let mut binary = blurred;
    for pixel in binary.pixels_mut() {
        pixel[0] = if pixel[0] > level { 0 } else { 255 };
    }
    let dilated = dilate_rect(&binary, (w / 100).max(1), (h / 100).max(1));

    let mut rects: Vec<_> = find_contours::<u32>(&dilated)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Polygon::from_contour(c).min_area_rect())
        .collect();
    rects.sort_by(|a, b| {
        b.elongation()
            .partial_cmp(&a.elongation())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut angles: Vec<f32> = rects
        .iter()
        .take(n_ct)
        .filter(|r| r.elongation() > ratio_threshold_for_lines)
        .map(|r| r.long_side_angle())
        .collect();
    tracing::debug!("orientation vote over {} line(s)", angles.len());

    if angles.is_empty() {
        return 0.0;
    }
    angles.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_low = angles[(angles.len() - 1) / 2];
    let estimate = (-median_low).round();
    if estimate == 0.0 { 0.0 } else { estimate }
}

/// Largest structuring element side an imageproc [`Mask`] accepts.
const MAX_KERNEL_SIDE: u32 = 511;

/// Dilation with a `kx x ky` rectangle anchored at its centre.
fn dilate_rect(image: &GrayImage, kx: u32, ky: u32) -> GrayImage {
    let (kx, ky) = (kx.clamp(1, MAX_KERNEL_SIDE), ky.clamp(1, MAX_KERNEL_SIDE));
    let kernel = GrayImage::from_pixel(kx, ky, Luma([255]));
    let mask = Mask::from_image(&kernel, (kx / 2) as u8, (ky / 2) as u8);
    grayscale_dilate(image, &mask)
}
