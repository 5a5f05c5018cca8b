//! Weight file resolution for both backends.
//!
//! ONNX Runtime takes exported graphs, either as a bare `.onnx` file or as a
//! `.zip` archive that contains one. Candle takes state dicts saved from the
//! PyTorch models, as `.safetensors` or pickled `.pt`/`.pth` files.

use crate::core::{OCRError, OcrResult};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Key prefix added when a checkpoint is saved from a wrapping predictor.
pub const WRAPPED_KEY_PREFIX: &str = "model.";

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn ensure_exists(path: &Path) -> OcrResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(OCRError::model_load_error(
            path,
            "weight file not found",
            Some("check the path passed as path_weights"),
            None::<std::io::Error>,
        ))
    }
}

/// Returns the `.onnx` graph to open for `path_weights`.
///
/// A `.zip` archive is extracted next to itself first.
pub fn resolve_onnx_weights(path_weights: &Path) -> OcrResult<PathBuf> {
    ensure_exists(path_weights)?;
    match extension(path_weights).as_str() {
        "onnx" => Ok(path_weights.to_path_buf()),
        "zip" => extract_onnx_archive(path_weights),
        other => Err(OCRError::model_load_error(
            path_weights,
            format!("unsupported weight format '.{other}' for the onnx backend"),
            Some("pass an exported .onnx graph or a .zip archive containing one"),
            None::<std::io::Error>,
        )),
    }
}

/// Extracts `archive` into its parent directory and returns the contained graph.
///
/// Entries whose names would escape the target directory are skipped.
pub fn extract_onnx_archive(archive: &Path) -> OcrResult<PathBuf> {
    let target = archive
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| OCRError::weight_loading(format!("failed to read {}", archive.display()), e))?;

    let mut graph: Option<PathBuf> = None;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| OCRError::weight_loading("failed to read archive entry", e))?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("skipping archive entry with unsafe name '{}'", entry.name());
            continue;
        };
        let out_path = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        if graph.is_none() && extension(&out_path) == "onnx" {
            graph = Some(out_path);
        }
    }

    tracing::info!(
        "extracted {} entries from {} into {}",
        zip.len(),
        archive.display(),
        target.display()
    );

    graph.ok_or_else(|| {
        OCRError::model_load_error(
            archive,
            "archive contains no .onnx graph",
            Some("zip the exported .onnx file"),
            None::<std::io::Error>,
        )
    })
}

/// Strips [`WRAPPED_KEY_PREFIX`] when every key carries it.
///
/// Mixed checkpoints are left untouched.
pub fn strip_wrapper_prefix<V>(tensors: HashMap<String, V>) -> HashMap<String, V> {
    let wrapped = !tensors.is_empty()
        && tensors
            .keys()
            .all(|k| k.starts_with(WRAPPED_KEY_PREFIX));
    if !wrapped {
        return tensors;
    }
    tracing::debug!("stripping '{WRAPPED_KEY_PREFIX}' prefix from {} keys", tensors.len());
    tensors
        .into_iter()
        .map(|(k, v)| (k[WRAPPED_KEY_PREFIX.len()..].to_string(), v))
        .collect()
}

#[cfg(feature = "candle")]
pub use candle_weights::{candle_device, load_state_dict, var_builder};

#[cfg(feature = "candle")]
mod candle_weights {
    use super::*;
    use crate::core::Device;
    use candle_core::{DType, Tensor};
    use candle_nn::VarBuilder;

    /// Maps a crate device onto a Candle device.
    pub fn candle_device(device: Device) -> OcrResult<candle_core::Device> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(ordinal) => candle_core::Device::new_cuda(ordinal).map_err(|e| {
                OCRError::inference_error("candle", &format!("failed to open {device}"), e)
            }),
        }
    }

    /// Reads a state dict onto `device`, with the wrapper prefix removed.
    pub fn load_state_dict(
        path_weights: &Path,
        device: &candle_core::Device,
    ) -> OcrResult<HashMap<String, Tensor>> {
        ensure_exists(path_weights)?;
        let load_err = |e: candle_core::Error| {
            OCRError::model_load_error(
                path_weights,
                "failed to read state dict",
                Some("save the weights with torch.save(model.state_dict()) or as safetensors"),
                Some(e),
            )
        };
        let tensors: HashMap<String, Tensor> = match extension(path_weights).as_str() {
            "safetensors" => candle_core::safetensors::load(path_weights, device).map_err(load_err)?,
            "pt" | "pth" => candle_core::pickle::read_all(path_weights)
                .map_err(load_err)?
                .into_iter()
                .map(|(name, t)| t.to_device(device).map(|t| (name, t)))
                .collect::<candle_core::Result<_>>()
                .map_err(load_err)?,
            other => {
                return Err(OCRError::model_load_error(
                    path_weights,
                    format!("unsupported weight format '.{other}' for the candle backend"),
                    Some("pass a .safetensors, .pt or .pth state dict"),
                    None::<std::io::Error>,
                ));
            }
        };
        tracing::debug!(
            "read {} tensors from {}",
            tensors.len(),
            path_weights.display()
        );
        Ok(strip_wrapper_prefix(tensors))
    }

    /// Builds a `VarBuilder` over the state dict at `path_weights`.
    pub fn var_builder(
        path_weights: &Path,
        device: &candle_core::Device,
    ) -> OcrResult<VarBuilder<'static>> {
        let tensors = load_state_dict(path_weights, device)?;
        Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::<'_, ()>::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_onnx_file_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db_resnet50.onnx");
        std::fs::write(&path, b"graph").unwrap();
        assert_eq!(resolve_onnx_weights(&path).unwrap(), path);
    }

    #[test]
    fn test_zip_is_extracted_next_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("crnn.zip");
        write_archive(
            &archive,
            &[("README.txt", b"weights"), ("crnn_vgg16_bn.onnx", b"graph")],
        );

        let graph = resolve_onnx_weights(&archive).unwrap();
        assert_eq!(graph, dir.path().join("crnn_vgg16_bn.onnx"));
        assert_eq!(std::fs::read(&graph).unwrap(), b"graph");
        assert!(dir.path().join("README.txt").is_file());
    }

    #[test]
    fn test_zip_without_graph_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        write_archive(&archive, &[("notes.txt", b"nothing here")]);
        assert!(matches!(
            resolve_onnx_weights(&archive),
            Err(OCRError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_unknown_extension_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.h5");
        std::fs::write(&path, b"tf").unwrap();
        let err = resolve_onnx_weights(&path).unwrap_err();
        assert!(err.to_string().contains(".h5"));

        let missing = dir.path().join("missing.onnx");
        assert!(matches!(
            resolve_onnx_weights(&missing),
            Err(OCRError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_wrapper_prefix_is_stripped_only_when_universal() {
        let wrapped: HashMap<String, u8> = [("model.fpn.w".to_string(), 1), ("model.head.b".to_string(), 2)]
            .into_iter()
            .collect();
        let stripped = strip_wrapper_prefix(wrapped);
        assert_eq!(stripped.get("fpn.w"), Some(&1));
        assert_eq!(stripped.get("head.b"), Some(&2));

        let mixed: HashMap<String, u8> = [("model.fpn.w".to_string(), 1), ("head.b".to_string(), 2)]
            .into_iter()
            .collect();
        let kept = strip_wrapper_prefix(mixed);
        assert!(kept.contains_key("model.fpn.w"));
        assert!(kept.contains_key("head.b"));
    }
}
