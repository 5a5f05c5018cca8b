//! Component-level trait for inference engines.
//!
//! Predictors are assembled from a preprocessor, an inference engine and a
//! post-processor. Only the engine varies with the backend, so it is the one
//! component behind a trait.

use crate::core::OCRError;
use std::fmt::Debug;

/// Runs a network on a preprocessed batch.
pub trait InferenceEngine: Send + Sync + Debug {
    /// Input type for inference (typically a tensor)
    type Input: Send + Sync + Debug;

    /// Output type from inference (typically a tensor)
    type Output: Send + Sync + Debug;

    /// Perform inference on preprocessed input.
    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError>;

    /// String describing the inference engine (model type, backend, etc.)
    fn engine_info(&self) -> String;
}
