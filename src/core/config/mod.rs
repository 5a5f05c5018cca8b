//! Configuration types: validation, ONNX Runtime sessions, recognition overrides.

pub mod errors;
pub mod onnx;
pub mod recognition;

pub use errors::{ConfigError, ConfigValidator};
pub use onnx::{OrtGraphOptimizationLevel, OrtSessionConfig};
pub use recognition::RecognitionConfig;
