//! Predictor interfaces of the document pipeline.
//!
//! Pipeline components only see these traits: a layout component drives an
//! [`ObjectDetector`], a text-extraction component hands crops to a
//! [`TextRecognizer`], and a page-preparation component asks an
//! [`ImageTransformer`] for a correction and applies it.

use crate::core::OcrResult;
use crate::core::backend::Requirement;
use crate::domain::{Categories, DetectionResult, ObjectTypes};
use image::RgbImage;

/// Behaviour shared by every predictor.
pub trait PredictorBase: Send + Sync {
    /// Human readable model name, stable for the same architecture and weights.
    fn name(&self) -> &str;

    /// Short identifier derived from [`PredictorBase::name`].
    fn model_id(&self) -> &str;

    /// Backends the predictor can run on and whether they are available.
    fn get_requirements(&self) -> OcrResult<Vec<Requirement>>;

    /// Builds a fresh, independent instance from the same construction arguments.
    fn clone_predictor(&self) -> OcrResult<Self>
    where
        Self: Sized;
}

/// A predictor that locates objects in a full page image.
pub trait ObjectDetector: PredictorBase {
    /// Runs detection on one image.
    fn predict(&self, image: &RgbImage) -> OcrResult<Vec<DetectionResult>>;

    /// Categories this detector can emit.
    fn possible_categories(&self) -> Vec<ObjectTypes>;

    /// Mapping from output label to category.
    fn categories(&self) -> &Categories;
}

/// A predictor that reads text from a batch of cropped images.
pub trait TextRecognizer: PredictorBase {
    /// Recognizes each `(annotation id, crop)` pair.
    ///
    /// Returns one result per input, in input order, each carrying the
    /// annotation id of its crop.
    fn predict(&self, images: &[(String, RgbImage)]) -> OcrResult<Vec<DetectionResult>>;
}

/// A predictor that estimates a page-level correction and applies it.
pub trait ImageTransformer: PredictorBase {
    /// Estimates the correction for an image.
    fn predict(&self, image: &RgbImage) -> OcrResult<DetectionResult>;

    /// Applies a correction previously returned by [`ImageTransformer::predict`].
    fn transform(&self, image: &RgbImage, specification: &DetectionResult)
    -> OcrResult<RgbImage>;

    /// Category of the estimate this transformer produces.
    fn possible_category(&self) -> ObjectTypes;
}
