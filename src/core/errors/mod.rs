//! Error types for the docTR adapters.
//!
//! # Usage
//!
//! ```rust
//! use oar_doctr::core::errors::OCRError;
//!
//! let error = OCRError::tensor_operation(
//!     "Failed to reshape tensor for batch processing",
//!     std::io::Error::new(std::io::ErrorKind::InvalidData, "Invalid tensor shape"),
//! );
//! let config_error = OCRError::config_error("Missing required model path");
//! # let _ = (error, config_error);
//! ```

pub mod constructors;
pub mod types;

pub use types::{OCRError, ProcessingStage, SimpleError};

/// Convenient result alias for OCR operations.
pub type OcrResult<T> = Result<T, OCRError>;
