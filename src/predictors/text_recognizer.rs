//! Text recognizer backed by a docTR recognition network.

use super::common::{model_id, model_name, resolve_backend};
use crate::core::backend::{Requirement, requirements};
use crate::core::config::{OrtSessionConfig, RecognitionConfig};
use crate::core::traits::{PredictorBase, TextRecognizer};
use crate::core::{Backend, Device, OcrResult};
use crate::domain::{DetectionResult, RecognitionArchConfig, recognition_arch};
use crate::models::DoctrRecognitionModel;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Reads the text of cropped word or line images.
#[derive(Debug)]
pub struct DoctrTextRecognizer {
    name: String,
    model_id: String,
    architecture: String,
    path_weights: PathBuf,
    path_config_json: Option<PathBuf>,
    device: Device,
    backend: Backend,
    ort_config: OrtSessionConfig,
    model: DoctrRecognitionModel,
}

impl DoctrTextRecognizer {
    /// Loads `architecture` from `path_weights`.
    ///
    /// `path_config_json` describes checkpoints trained with a custom
    /// vocabulary or normalization; see [`RecognitionConfig`].
    pub fn new(
        architecture: &str,
        path_weights: impl AsRef<Path>,
        device: Option<Device>,
        backend: Option<Backend>,
        path_config_json: Option<PathBuf>,
    ) -> OcrResult<Self> {
        Self::with_session_config(
            architecture,
            path_weights,
            device,
            backend,
            path_config_json,
            OrtSessionConfig::default(),
        )
    }

    /// Like [`DoctrTextRecognizer::new`], with ONNX Runtime session tuning.
    pub fn with_session_config(
        architecture: &str,
        path_weights: impl AsRef<Path>,
        device: Option<Device>,
        backend: Option<Backend>,
        path_config_json: Option<PathBuf>,
        ort_config: OrtSessionConfig,
    ) -> OcrResult<Self> {
        let path_weights = path_weights.as_ref().to_path_buf();
        let (device, backend) = resolve_backend(device, backend)?;
        let model = Self::get_wrapped_model(
            architecture,
            &path_weights,
            device,
            backend,
            path_config_json.as_deref(),
            &ort_config,
        )?;
        let name = model_name(architecture, &path_weights);
        tracing::debug!("{name} ready on {}", model.engine_info());
        Ok(Self {
            model_id: model_id(&name),
            name,
            architecture: architecture.to_string(),
            path_weights,
            path_config_json,
            device,
            backend,
            ort_config,
            model,
        })
    }

    /// Builds the recognition model for `architecture` and loads its weights.
    pub fn get_wrapped_model(
        architecture: &str,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        path_config_json: Option<&Path>,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<DoctrRecognitionModel> {
        let (arch, config) = Self::build_model(architecture, path_config_json)?;
        DoctrRecognitionModel::load(arch, config, path_weights, device, backend, ort_config)
    }

    /// Resolves the architecture and its effective configuration.
    ///
    /// Without a config file the architecture defaults apply.
    pub fn build_model(
        architecture: &str,
        path_config_json: Option<&Path>,
    ) -> OcrResult<(RecognitionArchConfig, RecognitionConfig)> {
        let arch = recognition_arch(architecture)?;
        let config = match path_config_json {
            Some(path) => RecognitionConfig::from_json_file(&arch, path)?,
            None => RecognitionConfig::from_arch(&arch)?,
        };
        Ok((arch, config))
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn config(&self) -> &RecognitionConfig {
        self.model.config()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl PredictorBase for DoctrTextRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn get_requirements(&self) -> OcrResult<Vec<Requirement>> {
        requirements()
    }

    fn clone_predictor(&self) -> OcrResult<Self> {
        Self::with_session_config(
            &self.architecture,
            &self.path_weights,
            Some(self.device),
            Some(self.backend),
            self.path_config_json.clone(),
            self.ort_config.clone(),
        )
    }
}

impl TextRecognizer for DoctrTextRecognizer {
    fn predict(&self, images: &[(String, RgbImage)]) -> OcrResult<Vec<DetectionResult>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let crops: Vec<RgbImage> = images.iter().map(|(_, crop)| crop.clone()).collect();
        let readings = self.model.forward(&crops)?;
        Ok(images
            .iter()
            .zip(readings)
            .map(|((uuid, _), (text, score))| DetectionResult::recognized_text(uuid.clone(), text, score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_build_model_defaults() {
        let (arch, config) = DoctrTextRecognizer::build_model("crnn_vgg16_bn", None).unwrap();
        assert_eq!(arch.name, "crnn_vgg16_bn");
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.input_shape, [3, 32, 128]);
        assert!(!config.vocab.is_empty());
    }

    #[test]
    fn test_build_model_with_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"arch": "parseq", "url": null, "task": "recognition",
                "mean": [0.5, 0.5, 0.5], "std": [0.25, 0.25, 0.25],
                "batch_size": 8, "vocab": "0123456789"}}"#
        )
        .unwrap();
        let (_, config) = DoctrTextRecognizer::build_model("parseq", Some(file.path())).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.vocab, "0123456789");
        assert_eq!(config.mean, [0.5; 3]);
    }

    #[test]
    fn test_wrapped_model_checks_architecture_before_weights() {
        let Ok((device, backend)) = resolve_backend(None, None) else {
            return;
        };
        let err = DoctrTextRecognizer::get_wrapped_model(
            "crnn_resnet9000",
            Path::new("missing.onnx"),
            device,
            backend,
            None,
            &OrtSessionConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown architecture 'crnn_resnet9000'"));

        let err = DoctrTextRecognizer::get_wrapped_model(
            "crnn_vgg16_bn",
            Path::new("/nonexistent/crnn_vgg16_bn.onnx"),
            device,
            backend,
            None,
            &OrtSessionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::core::OCRError::ModelLoad { .. }));
    }

    #[test]
    fn test_build_model_rejects_unknown_architecture() {
        assert!(DoctrTextRecognizer::build_model("crnn_resnet9000", None).is_err());
    }
}
