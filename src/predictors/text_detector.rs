//! Text-line detector backed by a docTR detection network.

use super::common::{model_id, model_name, resolve_backend};
use crate::core::backend::{Requirement, requirements};
use crate::core::config::OrtSessionConfig;
use crate::core::traits::{ObjectDetector, PredictorBase};
use crate::core::{Backend, Device, OcrResult};
use crate::domain::{Categories, DetectionResult, LayoutType, ObjectTypes, detection_arch};
use crate::models::DoctrDetectionModel;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Finds word-level text lines on straight pages.
///
/// Every box is reported as a [`LayoutType::Word`] with class id `1`, in
/// coordinates relative to the page size.
///
/// ```rust,no_run
/// use oar_doctr::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let detector = DoctrTextlineDetector::new(
///     "db_resnet50",
///     "models/db_resnet50.onnx",
///     Categories::text_lines(),
///     None,
///     None,
/// )?;
/// let page = load_image(std::path::Path::new("page.png"))?;
/// for line in detector.predict(&page)? {
///     println!("{:?} {:?}", line.bbox, line.score);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DoctrTextlineDetector {
    name: String,
    model_id: String,
    architecture: String,
    path_weights: PathBuf,
    categories: Categories,
    device: Device,
    backend: Backend,
    ort_config: OrtSessionConfig,
    model: DoctrDetectionModel,
}

impl DoctrTextlineDetector {
    /// Loads `architecture` from `path_weights`.
    ///
    /// The backend defaults to [`crate::core::auto_select_backend`] and the
    /// device to [`crate::core::auto_select_device`] for that backend.
    pub fn new(
        architecture: &str,
        path_weights: impl AsRef<Path>,
        categories: Categories,
        device: Option<Device>,
        backend: Option<Backend>,
    ) -> OcrResult<Self> {
        Self::with_session_config(
            architecture,
            path_weights,
            categories,
            device,
            backend,
            OrtSessionConfig::default(),
        )
    }

    /// Like [`DoctrTextlineDetector::new`], with ONNX Runtime session tuning.
    pub fn with_session_config(
        architecture: &str,
        path_weights: impl AsRef<Path>,
        categories: Categories,
        device: Option<Device>,
        backend: Option<Backend>,
        ort_config: OrtSessionConfig,
    ) -> OcrResult<Self> {
        let path_weights = path_weights.as_ref().to_path_buf();
        let (device, backend) = resolve_backend(device, backend)?;
        let model =
            Self::get_wrapped_model(architecture, &path_weights, device, backend, &ort_config)?;
        let name = model_name(architecture, &path_weights);
        tracing::debug!("{name} ready on {}", model.engine_info());
        Ok(Self {
            model_id: model_id(&name),
            name,
            architecture: architecture.to_string(),
            path_weights,
            categories,
            device,
            backend,
            ort_config,
            model,
        })
    }

    /// Builds the detection model for `architecture` and loads its weights.
    pub fn get_wrapped_model(
        architecture: &str,
        path_weights: &Path,
        device: Device,
        backend: Backend,
        ort_config: &OrtSessionConfig,
    ) -> OcrResult<DoctrDetectionModel> {
        let arch = detection_arch(architecture)?;
        DoctrDetectionModel::load(arch, path_weights, device, backend, ort_config)
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn path_weights(&self) -> &Path {
        &self.path_weights
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl PredictorBase for DoctrTextlineDetector {
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
            self.categories.clone(),
            Some(self.device),
            Some(self.backend),
            self.ort_config.clone(),
        )
    }
}

impl ObjectDetector for DoctrTextlineDetector {
    fn predict(&self, image: &RgbImage) -> OcrResult<Vec<DetectionResult>> {
        let boxes = self
            .model
            .forward(std::slice::from_ref(image))?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(boxes
            .into_iter()
            .map(|[xmin, ymin, xmax, ymax, score]| {
                DetectionResult::text_line([xmin, ymin, xmax, ymax], score)
            })
            .collect())
    }

    fn possible_categories(&self) -> Vec<ObjectTypes> {
        vec![LayoutType::Word.into()]
    }

    fn categories(&self) -> &Categories {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OCRError;

    #[test]
    fn test_unknown_architecture_is_rejected_before_loading() {
        let Ok((device, backend)) = resolve_backend(None, None) else {
            return;
        };
        let err = DoctrTextlineDetector::get_wrapped_model(
            "db_resnet9000",
            Path::new("missing.onnx"),
            device,
            backend,
            &OrtSessionConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown architecture 'db_resnet9000'"));
    }

    #[test]
    fn test_missing_weights() {
        let result = DoctrTextlineDetector::new(
            "db_resnet50",
            "/nonexistent/db_resnet50.onnx",
            Categories::text_lines(),
            Some(Device::Cpu),
            None,
        );
        match result {
            Err(OCRError::ModelLoad { model_path, .. }) => {
                assert!(model_path.contains("db_resnet50.onnx"))
            }
            Err(OCRError::Dependency { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
