//! Backend dispatch for detection networks.

use crate::core::config::OrtSessionConfig;
use crate::core::{Backend, Device, InferenceEngine, OCRError, OcrResult, Tensor4D};
use crate::domain::DetectionArchConfig;
use std::path::Path;

#[cfg(feature = "onnx")]
use crate::core::{OrtInfer, OrtInfer4D};
#[cfg(feature = "candle")]
use crate::models::detection::DbResNet50;

/// A detection network on one of the compiled-in backends.
#[derive(Debug)]
pub enum DetectionEngine {
    #[cfg(feature = "onnx")]
    Onnx(OrtInfer4D),
    #[cfg(feature = "candle")]
    Candle(DbResNet50),
}

impl DetectionEngine {
    /// Loads the weights of `arch` for `backend` on `device`.
    #[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
    pub fn load(
        arch: &DetectionArchConfig,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<Self> {
        tracing::info!(
            "loading detection model {} from {} ({backend}, {device})",
            arch.name,
            path_weights.display()
        );
        match backend {
            #[cfg(feature = "onnx")]
            Backend::Onnx => {
                let graph = crate::models::weights::resolve_onnx_weights(path_weights)?;
                let inner = OrtInfer::with_device(graph, device, ort_config, 1)?;
                Ok(Self::Onnx(OrtInfer4D::new(inner)))
            }
            #[cfg(feature = "candle")]
            Backend::Candle => Self::load_candle(arch, path_weights, device),
            #[allow(unreachable_patterns)]
            other => Err(OCRError::dependency_error(format!(
                "backend {other} was not compiled in; enable the '{}' feature",
                other.feature_name()
            ))),
        }
    }

    #[cfg(feature = "candle")]
    fn load_candle(arch: &DetectionArchConfig, path_weights: &Path, device: Device) -> OcrResult<Self> {
        use crate::models::weights::{candle_device, var_builder};

        if arch.name != "db_resnet50" {
            return Err(OCRError::config_error(format!(
                "unsupported architecture for the candle backend: '{}'",
                arch.name
            )));
        }
        let device = candle_device(device)?;
        let vb = var_builder(path_weights, &device)?;
        let model = DbResNet50::load(vb).map_err(|e| {
            OCRError::model_load_error(
                path_weights,
                "state dict does not match db_resnet50",
                Some("use a docTR db_resnet50 checkpoint"),
                Some(e),
            )
        })?;
        Ok(Self::Candle(model))
    }
}

impl InferenceEngine for DetectionEngine {
    type Input = Tensor4D;
    type Output = Tensor4D;

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
    use crate::domain::detection_arch;
    use std::path::PathBuf;

    #[test]
    fn test_missing_weights_fail_to_load() {
        let arch = detection_arch("db_resnet50").unwrap();
        let path = PathBuf::from("/nonexistent/db_resnet50.onnx");
        let backend = crate::core::auto_select_backend();
        if let Ok(backend) = backend {
            let result = DetectionEngine::load(
                &arch,
                &path,
                Device::Cpu,
                backend,
                &OrtSessionConfig::default(),
            );
            assert!(matches!(result, Err(OCRError::ModelLoad { .. })));
        }
    }

    #[cfg(feature = "candle")]
    #[test]
    fn test_candle_rejects_other_architectures() {
        let arch = detection_arch("linknet_resnet18").unwrap();
        let result = DetectionEngine::load(
            &arch,
            Path::new("weights.safetensors"),
            Device::Cpu,
            Backend::Candle,
            &OrtSessionConfig::default(),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unsupported architecture for the candle backend"));
    }
}
