//! ONNX Runtime session configuration.

use serde::{Deserialize, Serialize};

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Configuration for ONNX Runtime sessions.
///
/// Every field is optional; unset fields keep ONNX Runtime's defaults. The
/// execution provider itself is derived from the predictor's
/// [`Device`](crate::core::backend::Device).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_from_json() {
        let cfg: OrtSessionConfig =
            serde_json::from_str(r#"{"intra_threads": 4, "optimization_level": "Level3"}"#)
                .unwrap();
        assert_eq!(cfg.intra_threads, Some(4));
        assert_eq!(cfg.inter_threads, None);
        assert_eq!(cfg.optimization_level, Some(OrtGraphOptimizationLevel::Level3));
    }

    #[test]
    fn test_builder_methods() {
        let cfg = OrtSessionConfig::new()
            .with_intra_threads(2)
            .with_inter_threads(1)
            .with_optimization_level(OrtGraphOptimizationLevel::DisableAll);
        assert_eq!(cfg.intra_threads, Some(2));
        assert_eq!(cfg.inter_threads, Some(1));
        assert_eq!(
            cfg.optimization_level,
            Some(OrtGraphOptimizationLevel::DisableAll)
        );
    }
}
