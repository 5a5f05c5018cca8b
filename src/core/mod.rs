//! The core module.
//!
//! This module contains the fundamental components shared by all predictors:
//! - Backend and device selection
//! - Tensor type aliases
//! - Configuration management
//! - Error handling
//! - ONNX Runtime inference engine
//! - Traits defining the predictor interfaces

pub mod backend;
pub mod batch;
pub mod config;
pub mod errors;
#[cfg(feature = "onnx")]
pub mod inference;
pub mod traits;

pub use backend::{
    Backend, Device, Requirement, auto_select_backend, auto_select_device, device_string,
};
pub use batch::{Tensor3D, Tensor4D};
pub use config::{ConfigError, ConfigValidator, OrtSessionConfig, RecognitionConfig};
pub use errors::{OCRError, OcrResult, ProcessingStage, SimpleError};
#[cfg(feature = "onnx")]
pub use inference::{OrtInfer, OrtInfer3D, OrtInfer4D};
pub use traits::{
    ImageTransformer, InferenceEngine, ObjectDetector, PredictorBase, TextRecognizer,
};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
