//! Inference backend and device selection.
//!
//! Two backends can run the docTR networks: ONNX Runtime (feature `onnx`) and
//! Candle (feature `candle`). A predictor uses exactly one of them. When the
//! caller does not pick one, [`auto_select_backend`] consults the environment
//! (`USE_ORT` / `USE_ONNXRUNTIME`, then `USE_CANDLE`) and falls back to
//! whichever backend was compiled in.

use crate::core::{OCRError, OcrResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ONNX_ENV_VARS: [&str; 2] = ["USE_ORT", "USE_ONNXRUNTIME"];
const CANDLE_ENV_VARS: [&str; 1] = ["USE_CANDLE"];

/// Numerical backend used to run a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// ONNX Runtime, loading exported `.onnx` graphs.
    Onnx,
    /// Candle, loading PyTorch/safetensors state dicts into native ports.
    Candle,
}

impl Backend {
    /// Whether the backend was compiled into this build.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Onnx => cfg!(feature = "onnx"),
            Backend::Candle => cfg!(feature = "candle"),
        }
    }

    /// Name of the cargo feature that enables the backend.
    pub fn feature_name(self) -> &'static str {
        match self {
            Backend::Onnx => "onnx",
            Backend::Candle => "candle",
        }
    }

    /// Fails with a dependency error when the backend is not compiled in.
    pub fn ensure_available(self) -> OcrResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(OCRError::dependency_error(format!(
                "backend {self} is not available; rebuild with the '{}' feature",
                self.feature_name()
            )))
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Onnx => f.write_str("onnx"),
            Backend::Candle => f.write_str("candle"),
        }
    }
}

impl FromStr for Backend {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onnx" | "ort" | "onnxruntime" => Ok(Backend::Onnx),
            "candle" => Ok(Backend::Candle),
            other => Err(OCRError::config_error_with_context(
                "backend",
                other,
                "expected 'onnx' or 'candle'",
            )),
        }
    }
}

/// Compute device a network is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA device with the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Parses `cpu`, `cuda`, `gpu` or `cuda:N`.
    pub fn parse(value: &str) -> OcrResult<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            s => {
                let ordinal = s
                    .strip_prefix("cuda:")
                    .or_else(|| s.strip_prefix("gpu:"))
                    .and_then(|n| n.parse::<usize>().ok());
                ordinal.map(Device::Cuda).ok_or_else(|| {
                    OCRError::config_error_with_context(
                        "device",
                        s,
                        "use 'cpu', 'cuda', or 'cuda:N'",
                    )
                })
            }
        }
    }

    pub fn is_cuda(self) -> bool {
        matches!(self, Device::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(n) => write!(f, "cuda:{n}"),
        }
    }
}

impl FromStr for Device {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Device::parse(s)
    }
}

/// A library a predictor needs, and whether this build has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: &'static str,
    pub available: bool,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Picks the backend from environment variables, then from availability.
pub fn auto_select_backend() -> OcrResult<Backend> {
    select_backend(env_flag)
}

fn select_backend(flag: impl Fn(&str) -> bool) -> OcrResult<Backend> {
    if Backend::Onnx.is_available() && ONNX_ENV_VARS.iter().any(|v| flag(v)) {
        tracing::debug!("backend selected from environment: onnx");
        return Ok(Backend::Onnx);
    }
    if Backend::Candle.is_available() && CANDLE_ENV_VARS.iter().any(|v| flag(v)) {
        tracing::debug!("backend selected from environment: candle");
        return Ok(Backend::Candle);
    }
    let fallback = [Backend::Onnx, Backend::Candle]
        .into_iter()
        .find(|b| b.is_available());
    match fallback {
        Some(backend) => {
            tracing::debug!("backend selected by availability: {backend}");
            Ok(backend)
        }
        None => Err(OCRError::dependency_error(
            "neither ONNX Runtime nor Candle has been compiled in; enable the 'onnx' or 'candle' feature",
        )),
    }
}

/// Picks CUDA when the backend can use it, CPU otherwise.
pub fn auto_select_device(backend: Backend) -> Device {
    let cuda = match backend {
        Backend::Onnx => onnx_cuda_available(),
        Backend::Candle => candle_cuda_available(),
    };
    let device = if cuda { Device::Cuda(0) } else { Device::Cpu };
    tracing::debug!("device selected for {backend}: {device}");
    device
}

#[cfg(all(feature = "onnx", feature = "cuda"))]
fn onnx_cuda_available() -> bool {
    use ort::execution_providers::ExecutionProvider;
    ort::execution_providers::CUDAExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

#[cfg(not(all(feature = "onnx", feature = "cuda")))]
fn onnx_cuda_available() -> bool {
    false
}

#[cfg(all(feature = "candle", feature = "cuda"))]
fn candle_cuda_available() -> bool {
    candle_core::utils::cuda_is_available()
}

#[cfg(not(all(feature = "candle", feature = "cuda")))]
fn candle_cuda_available() -> bool {
    false
}

/// Formats a device the way the backend names it.
pub fn device_string(backend: Backend, device: Device) -> String {
    match (backend, device) {
        (Backend::Onnx, Device::Cpu) => "CPUExecutionProvider".to_string(),
        (Backend::Onnx, Device::Cuda(n)) => format!("CUDAExecutionProvider:{n}"),
        (Backend::Candle, device) => device.to_string(),
    }
}

/// Requirements of predictors that only process images.
///
/// The image stack is a hard dependency, so these are always available.
pub fn image_requirements() -> Vec<Requirement> {
    vec![Requirement {
        name: "imageproc",
        available: true,
    }]
}

/// Backend requirements of the predictors.
///
/// Fails when no backend at all is available, since then no predictor can be built.
pub fn requirements() -> OcrResult<Vec<Requirement>> {
    let reqs: Vec<Requirement> = [Backend::Onnx, Backend::Candle]
        .into_iter()
        .map(|b| Requirement {
            name: b.feature_name(),
            available: b.is_available(),
        })
        .collect();
    if reqs.iter().any(|r| r.available) {
        Ok(reqs)
    } else {
        Err(OCRError::dependency_error(
            "neither ONNX Runtime nor Candle has been compiled in",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!(Device::parse("cpu").unwrap(), Device::Cpu);
        assert_eq!(Device::parse("CUDA").unwrap(), Device::Cuda(0));
        assert_eq!(Device::parse("gpu").unwrap(), Device::Cuda(0));
        assert_eq!(Device::parse("cuda:2").unwrap(), Device::Cuda(2));
        assert!(Device::parse("mps").is_err());
        assert!(Device::parse("cuda:x").is_err());
    }

    #[test]
    fn test_device_string_per_backend() {
        assert_eq!(device_string(Backend::Onnx, Device::Cpu), "CPUExecutionProvider");
        assert_eq!(
            device_string(Backend::Onnx, Device::Cuda(1)),
            "CUDAExecutionProvider:1"
        );
        assert_eq!(device_string(Backend::Candle, Device::Cuda(0)), "cuda:0");
        assert_eq!(device_string(Backend::Candle, Device::Cpu), "cpu");
    }

    #[test]
    fn test_truthy_values() {
        for v in ["1", "true", "TRUE", "yes", " on "] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "no"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("ort".parse::<Backend>().unwrap(), Backend::Onnx);
        assert_eq!("Candle".parse::<Backend>().unwrap(), Backend::Candle);
        assert!("tensorflow".parse::<Backend>().is_err());
    }

    #[cfg(all(feature = "onnx", feature = "candle"))]
    #[test]
    fn test_environment_picks_candle_over_default() {
        let backend = select_backend(|name| name == "USE_CANDLE").unwrap();
        assert_eq!(backend, Backend::Candle);
        let backend = select_backend(|name| name == "USE_CANDLE" || name == "USE_ORT").unwrap();
        assert_eq!(backend, Backend::Onnx);
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_fallback_prefers_onnx() {
        assert_eq!(select_backend(|_| false).unwrap(), Backend::Onnx);
        assert!(requirements().unwrap().iter().any(|r| r.name == "onnx" && r.available));
    }

    #[cfg(not(any(feature = "onnx", feature = "candle")))]
    #[test]
    fn test_no_backend_is_a_dependency_error() {
        assert!(matches!(
            select_backend(|_| true),
            Err(OCRError::Dependency { .. })
        ));
        assert!(requirements().is_err());
        assert!(image_requirements().iter().all(|r| r.available));
    }
}
