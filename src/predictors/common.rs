//! Naming and backend resolution shared by the predictors.

use crate::core::{Backend, Device, OcrResult, auto_select_backend, auto_select_device};
use sha2::{Digest, Sha256};
use std::path::Path;

/// `doctr_<architecture>` followed by the last two components of the weight path joined by `_`.
pub(crate) fn model_name(architecture: &str, path_weights: &Path) -> String {
    let parts: Vec<String> = path_weights
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let tail = parts[parts.len().saturating_sub(2)..].join("_");
    format!("doctr_{architecture}{tail}")
}

/// First eight hex digits of the SHA-256 of `name`.
pub(crate) fn model_id(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Fills in the backend and device the caller left open.
pub(crate) fn resolve_backend(
    device: Option<Device>,
    backend: Option<Backend>,
) -> OcrResult<(Device, Backend)> {
    let backend = match backend {
        Some(backend) => {
            backend.ensure_available()?;
            backend
        }
        None => auto_select_backend()?,
    };
    let device = device.unwrap_or_else(|| auto_select_device(backend));
    Ok((device, backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_uses_last_two_path_parts() {
        assert_eq!(
            model_name("db_resnet50", Path::new("/models/doctr/db_resnet50-ac60cadc.pt")),
            "doctr_db_resnet50doctr_db_resnet50-ac60cadc.pt"
        );
        assert_eq!(
            model_name("crnn_vgg16_bn", Path::new("crnn.onnx")),
            "doctr_crnn_vgg16_bncrnn.onnx"
        );
    }

    #[test]
    fn test_model_id_is_stable_and_short() {
        let id = model_id("doctr_db_resnet50weights_db.pt");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, model_id("doctr_db_resnet50weights_db.pt"));
        assert_ne!(id, model_id("doctr_db_resnet34weights_db.pt"));
        // sha256("abc") = ba7816bf...
        assert_eq!(model_id("abc"), "ba7816bf");
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_explicit_choices_are_kept() {
        let (device, backend) = resolve_backend(Some(Device::Cuda(1)), Some(Backend::Onnx)).unwrap();
        assert_eq!(device, Device::Cuda(1));
        assert_eq!(backend, Backend::Onnx);
    }

    #[cfg(not(feature = "candle"))]
    #[test]
    fn test_unavailable_backend_is_rejected() {
        assert!(resolve_backend(None, Some(Backend::Candle)).is_err());
    }
}
