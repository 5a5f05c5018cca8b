use super::*;
use crate::core::backend::Device;
use crate::core::config::{OrtGraphOptimizationLevel, OrtSessionConfig};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;

impl OrtInfer {
    /// Opens a graph on the CPU with default session settings.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, OCRError> {
        Self::with_device(model_path, Device::Cpu, &OrtSessionConfig::default(), 1)
    }

    /// Opens a graph on `device` with a pool of `pool_size` sessions.
    ///
    /// The input name is taken from the graph itself, so exports with
    /// `input`, `x` or any other first-input name work alike.
    pub fn with_device(
        model_path: impl AsRef<Path>,
        device: Device,
        config: &OrtSessionConfig,
        pool_size: usize,
    ) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Self::configure(Session::builder()?, device, config)?;
            let session = builder.commit_from_file(path).map_err(|e| {
                OCRError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check the device and the exported graph"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        let input_name = {
            let first = sessions[0].lock().map_err(|_| {
                OCRError::invalid_input("failed to acquire session lock while reading inputs")
            })?;
            first
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| {
                    OCRError::model_load_error(
                        path,
                        "graph declares no inputs",
                        None,
                        None::<std::io::Error>,
                    )
                })?
        };

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(
            "opened ONNX graph '{}' on {} ({} session(s), input '{}')",
            model_name,
            device,
            pool_size,
            input_name
        );

        Ok(OrtInfer {
            sessions,
            next_idx: std::sync::atomic::AtomicUsize::new(0),
            input_name,
            output_name: None,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn configure(
        mut builder: SessionBuilder,
        device: Device,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        builder = builder.with_log_level(LogLevel::Error)?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(level) = cfg.optimization_level {
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
                OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
                OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
                OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        builder.with_execution_providers(Self::execution_providers(device))
    }

    /// Execution providers for a device, CPU always last as the fallback.
    pub(super) fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
        let mut providers = Vec::with_capacity(2);
        #[cfg(feature = "cuda")]
        if let Device::Cuda(id) = device {
            let id = i32::try_from(id).unwrap_or(0);
            providers.push(
                ort::execution_providers::CUDAExecutionProvider::default()
                    .with_device_id(id)
                    .build(),
            );
        }
        #[cfg(not(feature = "cuda"))]
        if device.is_cuda() {
            tracing::warn!("CUDA requested but the 'cuda' feature is disabled; using CPU");
        }
        providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
        providers
    }
}
