//! Resizing and normalization in front of the docTR networks.
//!
//! Every image is resized to the network's fixed input size, optionally
//! keeping its aspect ratio and padding the rest with black, then scaled to
//! `[0, 1]` and normalized channel-wise. The [`ContentWindow`] recorded per
//! image says where the real content ended up inside the padded input, so that
//! relative predictions can be mapped back onto the original image.

use crate::core::config::RecognitionConfig;
use crate::core::{OCRError, OcrResult, Tensor4D};
use crate::domain::architecture::DetectionArchConfig;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{Array3, Axis};
use rayon::prelude::*;

/// Position of the resized content inside the network input, in relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentWindow {
    pub x_offset: f32,
    pub y_offset: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for ContentWindow {
    fn default() -> Self {
        Self::full()
    }
}

impl ContentWindow {
    /// Window covering the whole input (no padding).
    pub fn full() -> Self {
        Self {
            x_offset: 0.0,
            y_offset: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Maps a relative point of the network input onto the original image, clipped to `[0, 1]`.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = ((x - self.x_offset) / self.width).clamp(0.0, 1.0);
        let oy = ((y - self.y_offset) / self.height).clamp(0.0, 1.0);
        (ox, oy)
    }
}

/// Preprocessor for the docTR networks.
#[derive(Debug, Clone)]
pub struct DoctrPreProcessor {
    target_height: u32,
    target_width: u32,
    /// `1 / (255 * std)` per channel.
    alpha: [f32; 3],
    /// `-mean / std` per channel.
    beta: [f32; 3],
    batch_size: usize,
    preserve_aspect_ratio: bool,
    symmetric_pad: bool,
}

impl DoctrPreProcessor {
    /// Creates a preprocessor for a `[C, H, W]` input.
    pub fn new(
        input_shape: [usize; 3],
        mean: [f32; 3],
        std: [f32; 3],
        batch_size: usize,
        preserve_aspect_ratio: bool,
        symmetric_pad: bool,
    ) -> OcrResult<Self> {
        let [channels, height, width] = input_shape;
        if channels != 3 || height == 0 || width == 0 {
            return Err(OCRError::config_error(format!(
                "input shape must be [3, H, W] with positive H and W, got {input_shape:?}"
            )));
        }
        if batch_size == 0 {
            return Err(OCRError::config_error("batch size must be greater than 0"));
        }
        if let Some(s) = std.iter().find(|s| **s <= 0.0) {
            return Err(OCRError::config_error(format!(
                "standard deviation must be greater than 0, got {s}"
            )));
        }

        let alpha = [0usize, 1, 2].map(|c| 1.0 / (255.0 * std[c]));
        let beta = [0usize, 1, 2].map(|c| -mean[c] / std[c]);

        Ok(Self {
            target_height: height as u32,
            target_width: width as u32,
            alpha,
            beta,
            batch_size,
            preserve_aspect_ratio,
            symmetric_pad,
        })
    }

    /// Preprocessor matching a detection architecture.
    pub fn for_detection(arch: &DetectionArchConfig) -> OcrResult<Self> {
        Self::new(
            arch.input_shape,
            arch.mean,
            arch.std,
            arch.batch_size,
            arch.preserve_aspect_ratio,
            arch.symmetric_pad,
        )
    }

    /// Preprocessor matching a recognition configuration.
    ///
    /// Crops keep their aspect ratio and are padded on the right and bottom.
    pub fn for_recognition(config: &RecognitionConfig) -> OcrResult<Self> {
        Self::new(
            config.input_shape,
            config.mean,
            config.std,
            config.batch_size,
            true,
            false,
        )
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `(height, width)` of the network input.
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_height, self.target_width)
    }

    /// Resizes (and pads) one image to the network input size.
    pub fn resize(&self, image: &RgbImage) -> (RgbImage, ContentWindow) {
        let (th, tw) = (self.target_height, self.target_width);
        let (w, h) = image.dimensions();
        if !self.preserve_aspect_ratio || w == 0 || h == 0 {
            let resized = imageops::resize(image, tw, th, FilterType::Triangle);
            return (resized, ContentWindow::full());
        }

        let actual_ratio = h as f32 / w as f32;
        let target_ratio = th as f32 / tw as f32;
        let (new_h, new_w) = if actual_ratio > target_ratio {
            (th, ((th as f32 / actual_ratio) as u32).max(1))
        } else {
            (((tw as f32 * actual_ratio) as u32).max(1), tw)
        };
        let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

        let (pad_w, pad_h) = (tw - new_w, th - new_h);
        let (left, top) = if self.symmetric_pad {
            (pad_w.div_ceil(2), pad_h.div_ceil(2))
        } else {
            (0, 0)
        };

        let mut canvas = RgbImage::from_pixel(tw, th, Rgb([0, 0, 0]));
        imageops::replace(&mut canvas, &resized, i64::from(left), i64::from(top));

        let window = ContentWindow {
            x_offset: left as f32 / tw as f32,
            y_offset: top as f32 / th as f32,
            width: new_w as f32 / tw as f32,
            height: new_h as f32 / th as f32,
        };
        (canvas, window)
    }

    /// Scales one resized image into a normalized CHW array.
    fn normalize(&self, image: &RgbImage) -> Array3<f32> {
        let (w, h) = image.dimensions();
        let mut out = Array3::<f32>::zeros((3, h as usize, w as usize));
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                out[[c, y as usize, x as usize]] =
                    f32::from(pixel[c]) * self.alpha[c] + self.beta[c];
            }
        }
        out
    }

    /// Resizes and normalizes a batch into a `(N, 3, H, W)` tensor.
    pub fn to_tensor(&self, images: &[RgbImage]) -> OcrResult<(Tensor4D, Vec<ContentWindow>)> {
        if images.is_empty() {
            return Err(OCRError::invalid_input("cannot build a tensor from an empty batch"));
        }
        let prepared: Vec<(Array3<f32>, ContentWindow)> = images
            .par_iter()
            .map(|img| {
                let (resized, window) = self.resize(img);
                (self.normalize(&resized), window)
            })
            .collect();

        let (th, tw) = (self.target_height as usize, self.target_width as usize);
        let mut batch = Tensor4D::zeros((prepared.len(), 3, th, tw));
        let mut windows = Vec::with_capacity(prepared.len());
        for (mut slot, (chw, window)) in batch.axis_iter_mut(Axis(0)).zip(prepared) {
            slot.assign(&chw);
            windows.push(window);
        }
        Ok((batch, windows))
    }

    /// Splits `images` into model batches and preprocesses each of them.
    pub fn process(&self, images: &[RgbImage]) -> OcrResult<Vec<(Tensor4D, Vec<ContentWindow>)>> {
        images
            .chunks(self.batch_size)
            .map(|chunk| self.to_tensor(chunk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(preserve: bool, symmetric: bool) -> DoctrPreProcessor {
        DoctrPreProcessor::new([3, 32, 128], [0.5; 3], [0.5; 3], 2, preserve, symmetric).unwrap()
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        assert!(DoctrPreProcessor::new([1, 32, 128], [0.5; 3], [0.5; 3], 2, true, false).is_err());
        assert!(DoctrPreProcessor::new([3, 32, 128], [0.5; 3], [0.5; 3], 0, true, false).is_err());
        assert!(DoctrPreProcessor::new([3, 32, 128], [0.5; 3], [0.0; 3], 2, true, false).is_err());
    }

    #[test]
    fn test_aspect_ratio_is_kept_with_right_padding() {
        let img = RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]));
        let (resized, window) = processor(true, false).resize(&img);
        assert_eq!(resized.dimensions(), (128, 32));
        assert_eq!(resized.get_pixel(10, 10), &Rgb([255, 255, 255]));
        assert_eq!(resized.get_pixel(100, 10), &Rgb([0, 0, 0]));
        assert_eq!(window.x_offset, 0.0);
        assert!((window.width - 0.5).abs() < 1e-6);
        assert_eq!(window.height, 1.0);
    }

    #[test]
    fn test_symmetric_padding_centres_content() {
        let img = RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]));
        let (resized, window) = processor(true, true).resize(&img);
        assert_eq!(resized.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(resized.get_pixel(64, 10), &Rgb([255, 255, 255]));
        assert!((window.x_offset - 0.25).abs() < 1e-6);
        let (x, y) = window.to_original(0.5, 0.5);
        assert!((x - 0.5).abs() < 1e-6 && (y - 0.5).abs() < 1e-6);
        assert_eq!(window.to_original(0.1, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_stretch_without_aspect_ratio() {
        let img = RgbImage::from_pixel(10, 90, Rgb([0, 0, 0]));
        let (resized, window) = processor(false, false).resize(&img);
        assert_eq!(resized.dimensions(), (128, 32));
        assert_eq!(window, ContentWindow::full());
    }

    #[test]
    fn test_normalization_and_batching() {
        let images: Vec<RgbImage> = (0..3)
            .map(|_| RgbImage::from_pixel(128, 32, Rgb([255, 0, 128])))
            .collect();
        let batches = processor(true, false).process(&images).unwrap();
        assert_eq!(batches.len(), 2);
        let (first, windows) = &batches[0];
        assert_eq!(first.shape(), &[2, 3, 32, 128]);
        assert_eq!(windows.len(), 2);
        // (1.0 - 0.5) / 0.5 and (0.0 - 0.5) / 0.5
        assert!((first[[0, 0, 5, 5]] - 1.0).abs() < 1e-5);
        assert!((first[[0, 1, 5, 5]] + 1.0).abs() < 1e-5);
        assert_eq!(batches[1].0.shape()[0], 1);
    }
}
