//! Core error types for the docTR adapters.
//!
//! This module defines the fundamental error types used throughout the crate,
//! including the main [`OCRError`] enum and the [`ProcessingStage`] enum that
//! tags where a processing failure happened.

use thiserror::Error;

/// Enum representing different stages of processing around model inference.
///
/// Used to identify which stage an error occurred in, providing context for
/// debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while unpacking or reading weight files.
    WeightLoading,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::WeightLoading => write!(f, "weight loading"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// A plain message error, used as the `source` of wrapped errors when no
/// underlying library error exists.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new simple error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Enum representing the errors that can occur while building or running
/// the docTR predictors.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during model inference with detailed context.
    #[error(
        "model '{model_name}' inference failed: {operation} on batch[{batch_index}] with input shape {input_shape:?}"
    )]
    ModelInference {
        /// The name of the model where inference failed.
        model_name: String,
        /// The operation that failed (e.g., "forward_pass", "output_extraction").
        operation: String,
        /// The batch index where the error occurred.
        batch_index: usize,
        /// The input tensor shape.
        input_shape: Vec<usize>,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// No usable inference backend, or a backend feature that is missing.
    #[error("missing dependency: {message}")]
    Dependency {
        /// A message describing what is missing.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[cfg(feature = "onnx")]
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations with detailed context.
    #[error(
        "tensor operation '{operation}' failed: expected shape {expected_shape:?}, got {actual_shape:?} in {context}"
    )]
    TensorOperation {
        /// The tensor operation that failed.
        operation: String,
        /// The expected tensor shape.
        expected_shape: Vec<usize>,
        /// The actual tensor shape.
        actual_shape: Vec<usize>,
        /// Additional context about where the error occurred.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from basic tensor operations (fallback for ndarray errors).
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<image::ImageError> for OCRError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for OCRError {
    fn from(error: serde_json::Error) -> Self {
        Self::ConfigError {
            message: format!("invalid JSON: {error}"),
        }
    }
}
