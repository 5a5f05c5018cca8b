//! docTR text recognition model: crop splitting, preprocessing, inference and decoding.

use super::RecognitionEngine;
use crate::core::config::{OrtSessionConfig, RecognitionConfig};
use crate::core::{Backend, Device, InferenceEngine, OCRError, OcrResult, Tensor3D, Tensor4D};
use crate::domain::RecognitionArchConfig;
use crate::processors::split_crops::{DILATION, MAX_ASPECT_RATIO, TARGET_ASPECT_RATIO};
use crate::processors::{DoctrPreProcessor, TextDecoder, remap_predictions, split_crops};
use image::RgbImage;
use std::path::Path;
use tracing::debug;

/// Recognition network together with its input processing and decoder.
#[derive(Debug)]
pub struct DoctrRecognitionModel<E = RecognitionEngine> {
    engine: E,
    arch: RecognitionArchConfig,
    config: RecognitionConfig,
    preprocessor: DoctrPreProcessor,
    decoder: TextDecoder,
    vocab_size: usize,
    split_wide_crops: bool,
}

impl DoctrRecognitionModel<RecognitionEngine> {
    /// Builds the model for `arch` with `config` and loads its weights.
    pub fn load(
        arch: RecognitionArchConfig,
        config: RecognitionConfig,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<Self> {
        let engine =
            RecognitionEngine::load(&arch, &config, path_weights, device, backend, ort_config)?;
        Self::new(engine, arch, config)
    }
}

impl<E> DoctrRecognitionModel<E>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    pub fn new(engine: E, arch: RecognitionArchConfig, config: RecognitionConfig) -> OcrResult<Self> {
        let preprocessor = DoctrPreProcessor::for_recognition(&config)?;
        let vocab = config.vocab_chars();
        let vocab_size = vocab.len();
        let decoder = TextDecoder::new(arch.decoding, vocab);
        Ok(Self {
            engine,
            arch,
            config,
            preprocessor,
            decoder,
            vocab_size,
            split_wide_crops: true,
        })
    }

    /// Whether crops wider than the split ratio are read in overlapping pieces (default `true`).
    pub fn with_split_wide_crops(mut self, split: bool) -> Self {
        self.split_wide_crops = split;
        self
    }

    pub fn arch(&self) -> &RecognitionArchConfig {
        &self.arch
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    pub fn engine_info(&self) -> String {
        self.engine.engine_info()
    }

    /// Runs the network on one preprocessed batch and checks the class dimension.
    pub fn infer(&self, batch: &Tensor4D) -> OcrResult<Tensor3D> {
        let logits = self.engine.infer(batch).map_err(|e| OCRError::Inference {
            model_name: self.arch.name.clone(),
            context: format!(
                "failed to run inference on batch with shape {:?}",
                batch.shape()
            ),
            source: Box::new(e),
        })?;
        let shape = logits.shape();
        if shape[0] != batch.shape()[0] || shape[2] <= self.vocab_size {
            return Err(OCRError::tensor_operation_error(
                "recognition_output",
                &[batch.shape()[0], shape[1], self.vocab_size + 1],
                shape,
                &format!(
                    "{} must emit at least |vocab| + 1 classes per step",
                    self.arch.name
                ),
                crate::core::SimpleError::new("class dimension does not match the vocabulary"),
            ));
        }
        Ok(logits)
    }

    /// Reads every crop, returning `(text, confidence)` in input order.
    pub fn forward(&self, crops: &[RgbImage]) -> OcrResult<Vec<(String, f32)>> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let (pieces, slots, remap_required) = if self.split_wide_crops {
            split_crops(crops, MAX_ASPECT_RATIO, TARGET_ASPECT_RATIO, DILATION)
        } else {
            (crops.to_vec(), Vec::new(), false)
        };
        if remap_required {
            debug!(
                "{}: {} crop(s) split into {} piece(s)",
                self.arch.name,
                crops.len(),
                pieces.len()
            );
        }

        let mut predictions = Vec::with_capacity(pieces.len());
        for (batch, _) in self.preprocessor.process(&pieces)? {
            let logits = self.infer(&batch)?;
            predictions.extend(self.decoder.decode(&logits));
        }

        if remap_required {
            Ok(remap_predictions(&predictions, &slots, DILATION))
        } else {
            Ok(predictions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recognition_arch;
    use image::Rgb;
    use ndarray::{Array3, Axis};

    /// Spells "ab" for every input whose first pixel is bright, "" otherwise.
    #[derive(Debug)]
    struct Speller {
        classes: usize,
    }

    impl InferenceEngine for Speller {
        type Input = Tensor4D;
        type Output = Tensor3D;

        fn infer(&self, input: &Tensor4D) -> Result<Tensor3D, OCRError> {
            let n = input.shape()[0];
            let blank = self.classes - 1;
            let mut logits = Array3::from_elem((n, 4, self.classes), 0.0f32);
            for (i, item) in input.axis_iter(Axis(0)).enumerate() {
                let bright = item[[0, 0, 0]] > 0.0;
                let steps = if bright { [0, blank, 1, blank] } else { [blank; 4] };
                for (t, class) in steps.into_iter().enumerate() {
                    logits[[i, t, class.min(blank)]] = 10.0;
                }
            }
            Ok(logits)
        }

        fn engine_info(&self) -> String {
            "speller".to_string()
        }
    }

    fn model(classes: usize) -> DoctrRecognitionModel<Speller> {
        let arch = recognition_arch("crnn_vgg16_bn").unwrap();
        let mut config = RecognitionConfig::from_arch(&arch).unwrap();
        config.vocab = "ab".to_string();
        config.batch_size = 2;
        DoctrRecognitionModel::new(Speller { classes }, arch, config).unwrap()
    }

    fn crop(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn test_predictions_follow_input_order_across_batches() {
        let crops = vec![crop(64, 32, 255), crop(64, 32, 0), crop(64, 32, 255)];
        let out = model(3).forward(&crops).unwrap();
        let texts: Vec<&str> = out.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["ab", "", "ab"]);
    }

    #[test]
    fn test_wide_crop_yields_a_single_prediction() {
        let crops = vec![crop(600, 30, 255), crop(64, 32, 0)];
        let out = model(3).forward(&crops).unwrap();
        assert_eq!(out.len(), 2);
        // Every piece reads "ab"; the overlap merge folds them into one reading.
        assert!(out[0].0.starts_with('a') && out[0].0.ends_with('b'));
        assert_eq!(out[1].0, "");
    }

    #[test]
    fn test_class_dimension_must_cover_vocab() {
        let err = model(2).forward(&[crop(64, 32, 255)]).unwrap_err();
        assert!(matches!(err, OCRError::TensorOperation { .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(model(3).forward(&[]).unwrap().is_empty());
    }
}
