//! ONNX Runtime inference.
//!
//! [`OrtInfer`] owns a small pool of sessions for one exported graph. The
//! dimensional wrappers adapt it to the [`InferenceEngine`](crate::core::InferenceEngine)
//! trait: detection graphs return `(N, 1, H, W)` logits, recognition graphs
//! return `(N, T, C)` logits.

pub mod ort_infer;
pub mod wrappers;

pub use ort_infer::OrtInfer;
pub use wrappers::{OrtInfer3D, OrtInfer4D};
