use super::*;
use crate::core::backend::Device;
use crate::core::config::OrtSessionConfig;

#[test]
fn test_missing_graph_is_a_model_load_error() {
    let result = OrtInfer::new("does/not/exist.onnx");
    assert!(matches!(result, Err(OCRError::ModelLoad { .. })));
}

#[test]
fn test_pool_of_sessions_fails_on_missing_graph() {
    let cfg = OrtSessionConfig::new().with_intra_threads(1);
    let result = OrtInfer::with_device("does/not/exist.onnx", Device::Cpu, &cfg, 3);
    assert!(result.is_err());
}

#[test]
fn test_cpu_provider_is_always_present() {
    assert_eq!(OrtInfer::execution_providers(Device::Cpu).len(), 1);
}
