//! Error constructor utilities.
//!
//! Ergonomic helpers for creating [`OCRError`] instances with the right
//! context and error chaining, so call sites stay one-liners:
//!
//! ```rust
//! use oar_doctr::core::OCRError;
//!
//! let err = OCRError::config_error("mean must have exactly 3 elements");
//! assert!(matches!(err, OCRError::ConfigError { .. }));
//!
//! let err = OCRError::model_load_error(
//!     "weights/db_resnet50.onnx",
//!     "file not found",
//!     Some("download the weights first"),
//!     None::<std::io::Error>,
//! );
//! assert!(err.to_string().contains("suggested fix"));
//! ```

use super::types::{OCRError, ProcessingStage, SimpleError};

impl OCRError {
    #[inline]
    fn processing_with_context(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an error for weight archive handling.
    pub fn weight_loading(
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::WeightLoading, context, error)
    }

    /// Creates an error for tensor operations without shape information.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::tensor_operation_error("unknown", &[], &[], context, error)
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError`.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError` naming the offending field and value.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!("invalid value '{value}' for '{field}': {reason}"),
        }
    }

    /// Creates a `Dependency` error for a missing backend or feature.
    pub fn dependency_error(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
        }
    }

    /// Creates a model inference error carrying the batch position and input shape.
    pub fn model_inference_error(
        model_name: &str,
        operation: &str,
        batch_index: usize,
        input_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelInference {
            model_name: model_name.to_string(),
            operation: operation.to_string(),
            batch_index,
            input_shape: input_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an inference error with model context.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for model load failures with contextual suggestions.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an error for tensor operations with detailed shape information.
    pub fn tensor_operation_error(
        operation: &str,
        expected_shape: &[usize],
        actual_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TensorOperation {
            operation: operation.to_string(),
            expected_shape: expected_shape.to_vec(),
            actual_shape: actual_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a shape mismatch error for a model output.
    pub fn output_shape_error(
        model_name: &str,
        expected_rank: usize,
        actual_shape: &[usize],
    ) -> Self {
        Self::tensor_operation_error(
            "output_validation",
            &[expected_rank],
            actual_shape,
            &format!("model '{model_name}' returned an unexpected output rank"),
            SimpleError::new("invalid output tensor dimensions"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_error_formats_suggestion() {
        let err = OCRError::model_load_error(
            "weights/crnn.onnx",
            "unsupported weight format",
            Some("use an .onnx or .zip file"),
            None::<std::io::Error>,
        );
        let msg = err.to_string();
        assert!(msg.contains("weights/crnn.onnx"));
        assert!(msg.contains("; suggested fix: use an .onnx or .zip file"));
    }

    #[test]
    fn test_model_inference_error_keeps_context() {
        let err = OCRError::model_inference_error(
            "crnn_vgg16_bn",
            "forward_pass",
            3,
            &[2, 3, 32, 128],
            "boom",
            SimpleError::new("failure"),
        );
        match err {
            OCRError::ModelInference {
                batch_index,
                input_shape,
                context,
                ..
            } => {
                assert_eq!(batch_index, 3);
                assert_eq!(input_shape, vec![2, 3, 32, 128]);
                assert_eq!(context, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_weight_loading_stage_display() {
        let err = OCRError::weight_loading("unzip", SimpleError::new("corrupt"));
        assert_eq!(err.to_string(), "weight loading failed: unzip");
    }
}
