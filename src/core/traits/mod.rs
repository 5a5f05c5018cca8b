//! Trait definitions.
//!
//! `standard` holds the predictor interfaces the document pipeline talks to;
//! `granular` holds the inference-engine seam used to assemble predictors.

pub mod granular;
pub mod standard;

pub use granular::InferenceEngine;
pub use standard::{ImageTransformer, ObjectDetector, PredictorBase, TextRecognizer};
