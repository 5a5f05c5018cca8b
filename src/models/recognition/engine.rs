//! Backend dispatch for recognition networks.

use crate::core::config::{OrtSessionConfig, RecognitionConfig};
use crate::core::{Backend, Device, InferenceEngine, OCRError, OcrResult, Tensor3D, Tensor4D};
use crate::domain::RecognitionArchConfig;
use std::path::Path;

#[cfg(feature = "onnx")]
use crate::core::{OrtInfer, OrtInfer3D};
#[cfg(feature = "candle")]
use crate::models::recognition::CrnnVgg16Bn;

/// A recognition network on one of the compiled-in backends.
#[derive(Debug)]
pub enum RecognitionEngine {
    #[cfg(feature = "onnx")]
    Onnx(OrtInfer3D),
    #[cfg(feature = "candle")]
    Candle(CrnnVgg16Bn),
}

impl RecognitionEngine {
    /// Loads the weights of `arch`, sized by `config`, for `backend` on `device`.
    #[cfg_attr(
        not(all(feature = "onnx", feature = "candle")),
        allow(unused_variables)
    )]
    pub fn load(
        arch: &RecognitionArchConfig,
        config: &RecognitionConfig,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<Self> {
        tracing::info!(
            "loading recognition model {} from {} ({backend}, {device})",
            arch.name,
            path_weights.display()
        );
        match backend {
            #[cfg(feature = "onnx")]
            Backend::Onnx => {
                let graph = crate::models::weights::resolve_onnx_weights(path_weights)?;
                let inner = OrtInfer::with_device(graph, device, ort_config, 1)?;
                Ok(Self::Onnx(OrtInfer3D::new(inner)))
            }
            #[cfg(feature = "candle")]
            Backend::Candle => Self::load_candle(arch, config, path_weights, device),
            #[allow(unreachable_patterns)]
            other => Err(OCRError::dependency_error(format!(
                "backend {other} was not compiled in; enable the '{}' feature",
                other.feature_name()
            ))),
        }
    }

    #[cfg(feature = "candle")]
    fn load_candle(
        arch: &RecognitionArchConfig,
        config: &RecognitionConfig,
        path_weights: &Path,
        device: Device,
    ) -> OcrResult<Self> {
        use crate::models::weights::{candle_device, var_builder};

        if arch.name != "crnn_vgg16_bn" {
            return Err(OCRError::config_error(format!(
                "unsupported architecture for the candle backend: '{}'",
                arch.name
            )));
        }
        let device = candle_device(device)?;
        let vb = var_builder(path_weights, &device)?;
        let vocab_size = config.vocab_chars().len();
        let model = CrnnVgg16Bn::load(config.input_shape, vocab_size, vb).map_err(|e| {
            OCRError::model_load_error(
                path_weights,
                format!("state dict does not match crnn_vgg16_bn with {vocab_size} characters"),
                Some("pass the config file the checkpoint was trained with"),
                Some(e),
            )
        })?;
        Ok(Self::Candle(model))
    }
}

impl InferenceEngine for RecognitionEngine {
    type Input = Tensor4D;
    type Output = Tensor3D;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError> {
        match self {
            #[cfg(feature = "onnx")]
            Self::Onnx(engine) => engine.infer(input),
            #[cfg(feature = "candle")]
            Self::Candle(engine) => engine.infer(input),
            #[cfg(not(any(feature = "onnx", feature = "candle")))]
            _ => Err(OCRError::dependency_error("no inference backend compiled in")),
        }
    }

    fn engine_info(&self) -> String {
        match self {
            #[cfg(feature = "onnx")]
            Self::Onnx(engine) => engine.engine_info(),
            #[cfg(feature = "candle")]
            Self::Candle(engine) => engine.engine_info(),
            #[cfg(not(any(feature = "onnx", feature = "candle")))]
            _ => String::from("unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recognition_arch;

    #[cfg(feature = "onnx")]
    #[test]
    fn test_onnx_rejects_unknown_weight_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crnn.bin");
        std::fs::write(&path, b"not a graph").unwrap();
        let arch = recognition_arch("crnn_vgg16_bn").unwrap();
        let config = RecognitionConfig::from_arch(&arch).unwrap();
        let err = RecognitionEngine::load(
            &arch,
            &config,
            &path,
            Device::Cpu,
            Backend::Onnx,
            &OrtSessionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
    }

    #[cfg(feature = "candle")]
    #[test]
    fn test_candle_supports_only_crnn_vgg16_bn() {
        let arch = recognition_arch("parseq").unwrap();
        let config = RecognitionConfig::from_arch(&arch).unwrap();
        let err = RecognitionEngine::load(
            &arch,
            &config,
            Path::new("parseq.pt"),
            Device::Cpu,
            Backend::Candle,
            &OrtSessionConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported architecture for the candle backend"));
    }
}
