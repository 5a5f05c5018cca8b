//! Recognition model configuration, optionally overridden by a JSON file.
//!
//! A config file is how custom-vocabulary checkpoints are described. It must
//! provide `mean`, `std` and `batch_size`; `vocab` and `input_shape` are
//! optional, and the bookkeeping keys `arch`, `url` and `task` are ignored.
//!
//! ```json
//! {
//!   "arch": "crnn_vgg16_bn",
//!   "mean": [0.694, 0.695, 0.693],
//!   "std": [0.299, 0.296, 0.301],
//!   "batch_size": 64,
//!   "vocab": "0123456789"
//! }
//! ```

use super::errors::{ConfigError, ConfigValidator};
use crate::core::OcrResult;
use crate::domain::RecognitionArchConfig;
use crate::domain::vocabs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

const IGNORED_KEYS: [&str; 3] = ["arch", "url", "task"];

/// Effective configuration of a recognition predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub batch_size: usize,
    /// Characters in class-index order.
    pub vocab: String,
    /// `[C, H, W]`
    pub input_shape: [usize; 3],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecognitionConfigFile {
    mean: [f32; 3],
    std: [f32; 3],
    batch_size: usize,
    vocab: Option<String>,
    input_shape: Option<[usize; 3]>,
}

impl RecognitionConfig {
    /// Configuration of a zoo architecture without overrides.
    pub fn from_arch(arch: &RecognitionArchConfig) -> OcrResult<Self> {
        let vocab = vocabs::vocab(&arch.vocab_name).ok_or_else(|| ConfigError::InvalidConfig {
            message: format!("unknown vocabulary '{}'", arch.vocab_name),
        })?;
        let config = Self {
            mean: arch.mean,
            std: arch.std,
            batch_size: arch.batch_size,
            vocab: vocab.to_string(),
            input_shape: arch.input_shape,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads overrides from a JSON config file.
    pub fn from_json_file(arch: &RecognitionArchConfig, path: impl AsRef<Path>) -> OcrResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("loading recognition config from {}", path.display());
        Self::from_json_str(arch, &content)
    }

    /// Parses overrides from a JSON string.
    pub fn from_json_str(arch: &RecognitionArchConfig, json: &str) -> OcrResult<Self> {
        let mut map: Map<String, Value> = serde_json::from_str(json)?;
        for key in IGNORED_KEYS {
            map.remove(key);
        }
        for key in ["mean", "std", "batch_size"] {
            if !map.contains_key(key) {
                return Err(ConfigError::MissingKey {
                    key: key.to_string(),
                    source_name: "recognition config".to_string(),
                }
                .into());
            }
        }
        let file: RecognitionConfigFile = serde_json::from_value(Value::Object(map))?;

        let mut config = Self::from_arch(arch)?;
        config.mean = file.mean;
        config.std = file.std;
        config.batch_size = file.batch_size;
        if let Some(vocab) = file.vocab {
            config.vocab = vocab;
        }
        if let Some(shape) = file.input_shape {
            config.input_shape = shape;
        }
        config.validate()?;
        Ok(config)
    }

    /// Vocabulary as indexable characters.
    pub fn vocab_chars(&self) -> Vec<char> {
        self.vocab.chars().collect()
    }
}

impl ConfigValidator for RecognitionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.batch_size)?;
        self.validate_mean_std(&self.mean, &self.std)?;
        self.validate_input_shape(self.input_shape)?;
        if self.vocab.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "vocab must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self {
            mean: crate::domain::architecture::RECOGNITION_MEAN,
            std: crate::domain::architecture::RECOGNITION_STD,
            batch_size: 32,
            vocab: vocabs::vocab(vocabs::DEFAULT_VOCAB)
                .unwrap_or_default()
                .to_string(),
            input_shape: [3, 32, 128],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recognition_arch;

    #[test]
    fn test_from_arch_uses_zoo_defaults() {
        let arch = recognition_arch("crnn_vgg16_bn").unwrap();
        let cfg = RecognitionConfig::from_arch(&arch).unwrap();
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.mean, [0.694, 0.695, 0.693]);
        assert_eq!(cfg.vocab, vocabs::vocab("french").unwrap());
        assert_eq!(cfg, RecognitionConfig::get_defaults());
    }

    #[test]
    fn test_json_overrides_and_ignored_keys() {
        let arch = recognition_arch("crnn_vgg16_bn").unwrap();
        let cfg = RecognitionConfig::from_json_str(
            &arch,
            r#"{"arch": "crnn_vgg16_bn", "url": null, "task": "recognition",
                "mean": [0.5, 0.5, 0.5], "std": [1.0, 1.0, 1.0], "batch_size": 8,
                "vocab": "0123456789", "input_shape": [3, 32, 256]}"#,
        )
        .unwrap();
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.mean, [0.5, 0.5, 0.5]);
        assert_eq!(cfg.vocab_chars().len(), 10);
        assert_eq!(cfg.input_shape, [3, 32, 256]);
    }

    #[test]
    fn test_json_requires_mean_std_batch_size() {
        let arch = recognition_arch("parseq").unwrap();
        let err = RecognitionConfig::from_json_str(&arch, r#"{"mean": [0.5, 0.5, 0.5]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("missing required key 'std'"));
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        let arch = recognition_arch("parseq").unwrap();
        let err = RecognitionConfig::from_json_str(
            &arch,
            r#"{"mean": [0.5, 0.5, 0.5], "std": [1.0, 0.0, 1.0], "batch_size": 4}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("std at index 1"));

        let err = RecognitionConfig::from_json_str(
            &arch,
            r#"{"mean": [0.5, 0.5, 0.5], "std": [1.0, 1.0, 1.0], "batch_size": 0}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mean": [0.1, 0.2, 0.3], "std": [0.4, 0.5, 0.6], "batch_size": 16}"#,
        )
        .unwrap();
        let arch = recognition_arch("master").unwrap();
        let cfg = RecognitionConfig::from_json_file(&arch, &path).unwrap();
        assert_eq!(cfg.std, [0.4, 0.5, 0.6]);
        assert_eq!(cfg.batch_size, 16);
    }
}
