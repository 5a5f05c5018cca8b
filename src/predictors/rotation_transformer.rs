//! Page deskewing from the direction of text lines.

use crate::core::backend::{Requirement, image_requirements};
use crate::core::traits::{ImageTransformer, PredictorBase};
use crate::core::{OCRError, OcrResult};
use crate::domain::{DetectionResult, ObjectTypes, PageType};
use crate::processors::{
    DEFAULT_NUMBER_CONTOURS, DEFAULT_RATIO_THRESHOLD_FOR_LINES, estimate_orientation,
};
use crate::utils::rotate_image;
use image::RgbImage;

const NAME: &str = "doctr_rotation_transformer";

/// Estimates how far a page is rotated and rotates it back.
///
/// No network is involved: the angle is voted from the most elongated
/// text-line blobs of the page.
#[derive(Debug, Clone)]
pub struct DocTrRotationTransformer {
    number_contours: usize,
    ratio_threshold_for_lines: f32,
    model_id: String,
}

impl Default for DocTrRotationTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_NUMBER_CONTOURS, DEFAULT_RATIO_THRESHOLD_FOR_LINES)
    }
}

impl DocTrRotationTransformer {
    /// `number_contours` contours at most take part in the vote; only those
    /// more than `ratio_threshold_for_lines` times longer than wide count as lines.
    pub fn new(number_contours: usize, ratio_threshold_for_lines: f32) -> Self {
        Self {
            number_contours,
            ratio_threshold_for_lines,
            model_id: super::common::model_id(NAME),
        }
    }

    pub fn number_contours(&self) -> usize {
        self.number_contours
    }

    pub fn ratio_threshold_for_lines(&self) -> f32 {
        self.ratio_threshold_for_lines
    }
}

impl PredictorBase for DocTrRotationTransformer {
    fn name(&self) -> &str {
        NAME
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn get_requirements(&self) -> OcrResult<Vec<Requirement>> {
        Ok(image_requirements())
    }

    fn clone_predictor(&self) -> OcrResult<Self> {
        Ok(Self::new(self.number_contours, self.ratio_threshold_for_lines))
    }
}

impl ImageTransformer for DocTrRotationTransformer {
    /// Returns the counter-clockwise rotation in `[0, 360)` degrees, rounded to two decimals.
    fn predict(&self, image: &RgbImage) -> OcrResult<DetectionResult> {
        let mut angle =
            estimate_orientation(image, self.number_contours, self.ratio_threshold_for_lines);
        if angle < 0.0 {
            angle += 360.0;
        }
        let angle = (angle * 100.0).round() / 100.0;
        tracing::debug!("{NAME}: estimated angle {angle}");
        Ok(DetectionResult::rotation(angle))
    }

    fn transform(&self, image: &RgbImage, specification: &DetectionResult) -> OcrResult<RgbImage> {
        let angle = specification.angle.ok_or_else(|| {
            OCRError::invalid_input(format!("{NAME} needs a result carrying an angle"))
        })?;
        Ok(rotate_image(image, angle))
    }

    fn possible_category(&self) -> ObjectTypes {
        PageType::Angle.into()
    }
}
