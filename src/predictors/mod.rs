//! docTR predictors behind the pipeline's predictor interfaces.
//!
//! * [`DoctrTextlineDetector`] - an [`ObjectDetector`](crate::core::traits::ObjectDetector) for text lines
//! * [`DoctrTextRecognizer`] - a [`TextRecognizer`](crate::core::traits::TextRecognizer) for cropped text
//! * [`DocTrRotationTransformer`] - an [`ImageTransformer`](crate::core::traits::ImageTransformer) that deskews pages

mod common;
pub mod rotation_transformer;
pub mod text_detector;
pub mod text_recognizer;

pub use rotation_transformer::DocTrRotationTransformer;
pub use text_detector::DoctrTextlineDetector;
pub use text_recognizer::DoctrTextRecognizer;
