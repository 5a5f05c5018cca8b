//! Segmentation-map post-processing for the docTR detection heads.
//!
//! DBNet, LinkNet and FAST all emit a single-channel text probability map;
//! they only differ by their thresholds and expansion ratio, which come from
//! the architecture configuration. Boxes are produced for straight pages:
//! axis-aligned `[xmin, ymin, xmax, ymax, score]`, relative to the original
//! image.

use crate::core::{OCRError, OcrResult, Tensor4D};
use crate::domain::architecture::DetectionArchConfig;
use crate::processors::geometry::{Point, Polygon, Rect};
use crate::processors::normalization::ContentWindow;
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use ndarray::{ArrayView2, Axis, s};

/// Boxes narrower or shorter than this many pixels are dropped.
const MIN_SIZE_BOX: f32 = 2.0;

/// A relative box with its confidence: `[xmin, ymin, xmax, ymax, score]`.
pub type RelativeBox = [f32; 5];

/// Turns probability logits into relative text boxes.
#[derive(Debug, Clone)]
pub struct DbPostProcessor {
    /// Threshold applied to the probability map.
    pub bin_thresh: f32,
    /// Minimum mean probability inside a box.
    pub box_thresh: f32,
    /// Expansion ratio applied to shrunk text kernels.
    pub unclip_ratio: f32,
}

impl DbPostProcessor {
    pub fn new(bin_thresh: f32, box_thresh: f32, unclip_ratio: f32) -> OcrResult<Self> {
        if !(0.0..=1.0).contains(&bin_thresh) || !(0.0..=1.0).contains(&box_thresh) {
            return Err(OCRError::config_error(format!(
                "thresholds must lie in [0, 1], got bin_thresh={bin_thresh}, box_thresh={box_thresh}"
            )));
        }
        if unclip_ratio <= 0.0 {
            return Err(OCRError::config_error_with_context(
                "unclip_ratio",
                &unclip_ratio.to_string(),
                "must be greater than 0",
            ));
        }
        Ok(Self {
            bin_thresh,
            box_thresh,
            unclip_ratio,
        })
    }

    pub fn from_arch(arch: &DetectionArchConfig) -> OcrResult<Self> {
        Self::new(arch.bin_thresh, arch.box_thresh, arch.unclip_ratio)
    }

    /// Post-processes a `(N, 1, H, W)` batch of logits.
    ///
    /// `windows[i]` maps boxes of image `i` back through its padding.
    pub fn apply(
        &self,
        logits: &Tensor4D,
        windows: &[ContentWindow],
    ) -> OcrResult<Vec<Vec<RelativeBox>>> {
        let shape = logits.shape();
        if shape[0] != windows.len() || shape[1] < 1 {
            return Err(OCRError::tensor_operation_error(
                "db_postprocess",
                &[windows.len(), 1, shape[2], shape[3]],
                shape,
                "probability map batch does not match the preprocessed images",
                crate::core::SimpleError::new("batch mismatch"),
            ));
        }

        let results: Vec<Vec<RelativeBox>> = logits
            .axis_iter(Axis(0))
            .zip(windows)
            .map(|(item, window)| {
                let prob = item.index_axis(Axis(0), 0).mapv(sigmoid);
                let bitmap = self.binarize(prob.view());
                self.bitmap_to_boxes(prob.view(), &bitmap)
                    .into_iter()
                    .filter_map(|b| map_through_window(b, window))
                    .collect()
            })
            .collect();
        Ok(results)
    }

    /// Thresholds the probability map and removes speckles with a 3x3 opening.
    fn binarize(&self, prob: ArrayView2<f32>) -> GrayImage {
        let (h, w) = prob.dim();
        let bitmap = GrayImage::from_fn(w as u32, h as u32, |x, y| {
            if prob[[y as usize, x as usize]] >= self.bin_thresh {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        morphology::open(&bitmap, Norm::LInf, 1)
    }

    /// Extracts relative boxes from a binary map.
    pub(crate) fn bitmap_to_boxes(&self, prob: ArrayView2<f32>, bitmap: &GrayImage) -> Vec<RelativeBox> {
        let (height, width) = (bitmap.height() as f32, bitmap.width() as f32);
        let mut boxes = Vec::new();

        for contour in find_contours::<u32>(bitmap) {
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }
            let polygon = Polygon::from_contour(&contour);
            let Some(extent) = polygon.bounding_rect() else {
                continue;
            };
            if extent.width() < MIN_SIZE_BOX || extent.height() < MIN_SIZE_BOX {
                continue;
            }

            // Pixel rectangle covering the contour, borders included.
            let rect = Rect {
                x_min: extent.x_min,
                y_min: extent.y_min,
                x_max: extent.x_max + 1.0,
                y_max: extent.y_max + 1.0,
            };
            let score = box_score(prob, &rect);
            if score < self.box_thresh {
                continue;
            }

            let expanded = self.unclip(&rect);
            if expanded.width() < MIN_SIZE_BOX || expanded.height() < MIN_SIZE_BOX {
                continue;
            }
            boxes.push([
                (expanded.x_min / width).clamp(0.0, 1.0),
                (expanded.y_min / height).clamp(0.0, 1.0),
                (expanded.x_max / width).clamp(0.0, 1.0),
                (expanded.y_max / height).clamp(0.0, 1.0),
                score.clamp(0.0, 1.0),
            ]);
        }
        boxes
    }

    /// Grows a shrunk text kernel by `area * unclip_ratio / perimeter` on every side.
    fn unclip(&self, rect: &Rect) -> Rect {
        let polygon = Polygon::new(vec![
            Point::new(rect.x_min, rect.y_min),
            Point::new(rect.x_max, rect.y_min),
            Point::new(rect.x_max, rect.y_max),
            Point::new(rect.x_min, rect.y_max),
        ]);
        let perimeter = polygon.perimeter();
        if perimeter <= f32::EPSILON {
            return *rect;
        }
        let distance = polygon.area() * self.unclip_ratio / perimeter;
        Rect {
            x_min: (rect.x_min - distance).floor(),
            y_min: (rect.y_min - distance).floor(),
            x_max: (rect.x_max + distance).ceil(),
            y_max: (rect.y_max + distance).ceil(),
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Mean probability inside a pixel rectangle.
fn box_score(prob: ArrayView2<f32>, rect: &Rect) -> f32 {
    let (h, w) = prob.dim();
    let clip = |v: f32, max: usize| (v.max(0.0) as usize).min(max.saturating_sub(1));
    let (x0, x1) = (clip(rect.x_min.floor(), w), clip(rect.x_max.ceil() - 1.0, w));
    let (y0, y1) = (clip(rect.y_min.floor(), h), clip(rect.y_max.ceil() - 1.0, h));
    prob.slice(s![y0..=y1, x0..=x1]).mean().unwrap_or(0.0)
}

fn map_through_window(b: RelativeBox, window: &ContentWindow) -> Option<RelativeBox> {
    let (xmin, ymin) = window.to_original(b[0], b[1]);
    let (xmax, ymax) = window.to_original(b[2], b[3]);
    (xmax > xmin && ymax > ymin).then_some([xmin, ymin, xmax, ymax, b[4]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    /// Logits with a high-probability block at `[y0, y1) x [x0, x1)`.
    fn logits_with_block(h: usize, w: usize, y0: usize, y1: usize, x0: usize, x1: usize) -> Tensor4D {
        let mut logits = Array4::from_elem((1, 1, h, w), -10.0f32);
        logits.slice_mut(s![0, 0, y0..y1, x0..x1]).fill(10.0);
        logits
    }

    #[test]
    fn test_single_block_becomes_expanded_box() {
        let post = DbPostProcessor::new(0.3, 0.1, 1.5).unwrap();
        let logits = logits_with_block(100, 200, 40, 50, 20, 120);
        let boxes = post.apply(&logits, &[ContentWindow::full()]).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].len(), 1);

        let [xmin, ymin, xmax, ymax, score] = boxes[0][0];
        assert!(score > 0.99);
        // Expanded beyond the kernel on every side.
        assert!(xmin < 20.0 / 200.0 && xmax > 120.0 / 200.0);
        assert!(ymin < 40.0 / 100.0 && ymax > 50.0 / 100.0);
        assert!(xmin >= 0.0 && ymax <= 1.0);
    }

    #[test]
    fn test_specks_are_removed_by_opening() {
        let post = DbPostProcessor::new(0.3, 0.1, 1.5).unwrap();
        let logits = logits_with_block(64, 64, 10, 11, 10, 11);
        let boxes = post.apply(&logits, &[ContentWindow::full()]).unwrap();
        assert!(boxes[0].is_empty());
    }

    #[test]
    fn test_low_scores_are_filtered() {
        let post = DbPostProcessor::new(0.3, 0.9, 1.5).unwrap();
        // sigmoid(0.5) ~ 0.62 passes the bitmap but not the box threshold.
        let logits = Array4::from_elem((1, 1, 32, 32), 0.5f32);
        let boxes = post.apply(&logits, &[ContentWindow::full()]).unwrap();
        assert!(boxes[0].is_empty());
    }

    #[test]
    fn test_boxes_are_mapped_through_padding() {
        let post = DbPostProcessor::new(0.3, 0.1, 1.0).unwrap();
        let logits = logits_with_block(100, 100, 20, 30, 30, 70);
        let window = ContentWindow {
            x_offset: 0.25,
            y_offset: 0.0,
            width: 0.5,
            height: 1.0,
        };
        let boxes = post.apply(&logits, &[window]).unwrap();
        let [xmin, _, xmax, _, _] = boxes[0][0];
        assert!(xmin < 0.1 && xmin >= 0.0);
        assert!(xmax > 0.9 && xmax <= 1.0);
    }

    #[test]
    fn test_batch_mismatch_is_an_error() {
        let post = DbPostProcessor::new(0.3, 0.1, 1.5).unwrap();
        let logits = Array4::zeros((2, 1, 8, 8));
        assert!(post.apply(&logits, &[ContentWindow::full()]).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DbPostProcessor::new(1.3, 0.1, 1.5).is_err());
        assert!(DbPostProcessor::new(0.3, 0.1, 0.0).is_err());
    }
}
