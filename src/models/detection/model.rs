//! docTR text detection model: preprocessing, inference and box decoding.

use super::DetectionEngine;
use crate::core::config::OrtSessionConfig;
use crate::core::{Backend, Device, InferenceEngine, OCRError, OcrResult, Tensor4D};
use crate::domain::DetectionArchConfig;
use crate::processors::{ContentWindow, DbPostProcessor, DoctrPreProcessor, RelativeBox};
use image::RgbImage;
use std::path::Path;
use tracing::debug;

/// Detection network together with its input and output processing.
///
/// The engine is generic so that any network producing `(N, 1, H, W)`
/// logits can be plugged in; predictors use [`DetectionEngine`].
#[derive(Debug)]
pub struct DoctrDetectionModel<E = DetectionEngine> {
    engine: E,
    arch: DetectionArchConfig,
    preprocessor: DoctrPreProcessor,
    postprocessor: DbPostProcessor,
}

impl DoctrDetectionModel<DetectionEngine> {
    /// Builds the model for `arch` and loads its weights.
    pub fn load(
        arch: DetectionArchConfig,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<Self> {
        let engine = DetectionEngine::load(&arch, path_weights, device, backend, ort_config)?;
        Self::new(engine, arch)
    }
}

impl<E> DoctrDetectionModel<E>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor4D>,
{
    pub fn new(engine: E, arch: DetectionArchConfig) -> OcrResult<Self> {
        let preprocessor = DoctrPreProcessor::for_detection(&arch)?;
        let postprocessor = DbPostProcessor::from_arch(&arch)?;
        Ok(Self {
            engine,
            arch,
            preprocessor,
            postprocessor,
        })
    }

    pub fn arch(&self) -> &DetectionArchConfig {
        &self.arch
    }

    pub fn engine_info(&self) -> String {
        self.engine.engine_info()
    }

    /// Resizes, pads and normalizes images into model batches.
    pub fn preprocess(&self, images: &[RgbImage]) -> OcrResult<Vec<(Tensor4D, Vec<ContentWindow>)>> {
        let batches = self.preprocessor.process(images)?;
        debug!(
            "{}: {} image(s) in {} batch(es)",
            self.arch.name,
            images.len(),
            batches.len()
        );
        Ok(batches)
    }

    /// Runs the network on one preprocessed batch.
    pub fn infer(&self, batch: &Tensor4D) -> OcrResult<Tensor4D> {
        let logits = self.engine.infer(batch).map_err(|e| OCRError::Inference {
            model_name: self.arch.name.clone(),
            context: format!(
                "failed to run inference on batch with shape {:?}",
                batch.shape()
            ),
            source: Box::new(e),
        })?;
        if logits.shape()[0] != batch.shape()[0] {
            return Err(OCRError::output_shape_error(&self.arch.name, 4, logits.shape()));
        }
        Ok(logits)
    }

    /// Decodes logits into relative boxes, one list per image.
    pub fn postprocess(
        &self,
        logits: &Tensor4D,
        windows: &[ContentWindow],
    ) -> OcrResult<Vec<Vec<RelativeBox>>> {
        self.postprocessor.apply(logits, windows)
    }

    /// preprocess -> infer -> postprocess over all images, in input order.
    pub fn forward(&self, images: &[RgbImage]) -> OcrResult<Vec<Vec<RelativeBox>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = Vec::with_capacity(images.len());
        for (batch, windows) in self.preprocess(images)? {
            let logits = self.infer(&batch)?;
            results.extend(self.postprocess(&logits, &windows)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection_arch;
    use image::Rgb;
    use ndarray::{Array4, s};

    /// Lights up the central quarter of every probability map.
    #[derive(Debug)]
    struct CentreBlock;

    impl InferenceEngine for CentreBlock {
        type Input = Tensor4D;
        type Output = Tensor4D;

        fn infer(&self, input: &Tensor4D) -> Result<Tensor4D, OCRError> {
            let (n, _, h, w) = input.dim();
            let mut logits = Array4::from_elem((n, 1, h, w), -10.0f32);
            logits
                .slice_mut(s![.., 0, h * 3 / 8..h * 5 / 8, w / 4..w * 3 / 4])
                .fill(10.0);
            Ok(logits)
        }

        fn engine_info(&self) -> String {
            "centre-block".to_string()
        }
    }

    fn small_arch() -> DetectionArchConfig {
        let mut arch = detection_arch("db_resnet50").unwrap();
        arch.input_shape = [3, 64, 64];
        arch
    }

    #[test]
    fn test_forward_returns_one_list_per_image() {
        let model = DoctrDetectionModel::new(CentreBlock, small_arch()).unwrap();
        let images: Vec<RgbImage> = (0..3)
            .map(|_| RgbImage::from_pixel(64, 64, Rgb([255, 255, 255])))
            .collect();
        let boxes = model.forward(&images).unwrap();
        assert_eq!(boxes.len(), 3);
        for image_boxes in &boxes {
            assert_eq!(image_boxes.len(), 1);
            let [xmin, ymin, xmax, ymax, score] = image_boxes[0];
            assert!(xmin < 0.25 && xmax > 0.75);
            assert!(ymin < 0.375 && ymax > 0.625);
            assert!(score > 0.9);
        }
    }

    #[test]
    fn test_padding_is_removed_from_boxes() {
        // A 64x32 page is centred in the 64x64 input with 16 rows of padding
        // above and below; the block covers rows 24..40, i.e. the middle of the page.
        let model = DoctrDetectionModel::new(CentreBlock, small_arch()).unwrap();
        let page = RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]));
        let boxes = model.forward(&[page]).unwrap();
        let [_, ymin, _, ymax, _] = boxes[0][0];
        assert!(ymin < 0.25 && ymax > 0.75);
        assert!(ymin >= 0.0 && ymax <= 1.0);
    }

    #[test]
    fn test_empty_input() {
        let model = DoctrDetectionModel::new(CentreBlock, small_arch()).unwrap();
        assert!(model.forward(&[]).unwrap().is_empty());
        assert_eq!(model.engine_info(), "centre-block");
    }
}
