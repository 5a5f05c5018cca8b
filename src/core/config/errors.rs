//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a batch size is invalid (must be greater than 0).
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that a required key is missing from a configuration file.
    #[error("missing required key '{key}' in {source_name}")]
    MissingKey { key: String, source_name: String },
}

/// A trait for validating configuration parameters.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a batch size.
    fn validate_batch_size(&self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            Err(ConfigError::InvalidBatchSize)
        } else {
            Ok(())
        }
    }

    /// Validates per-channel normalisation statistics.
    fn validate_mean_std(&self, mean: &[f32], std: &[f32]) -> Result<(), ConfigError> {
        if mean.len() != 3 || std.len() != 3 {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "mean and std must have exactly 3 elements, got {} and {}",
                    mean.len(),
                    std.len()
                ),
            });
        }
        if let Some((i, s)) = std.iter().enumerate().find(|(_, s)| **s <= 0.0) {
            return Err(ConfigError::InvalidConfig {
                message: format!("std at index {i} must be greater than 0, got {s}"),
            });
        }
        Ok(())
    }

    /// Validates a `[C, H, W]` input shape.
    fn validate_input_shape(&self, shape: [usize; 3]) -> Result<(), ConfigError> {
        if shape.contains(&0) {
            return Err(ConfigError::InvalidConfig {
                message: format!("input shape dimensions must be greater than 0, got {shape:?}"),
            });
        }
        if shape[0] != 3 {
            return Err(ConfigError::InvalidConfig {
                message: format!("input shape must have 3 channels, got {}", shape[0]),
            });
        }
        Ok(())
    }
}
