//! docTR networks behind the backend-independent [`InferenceEngine`](crate::core::InferenceEngine) seam.
//!
//! * `detection` - text detection engines and the detection model
//! * `recognition` - text recognition engines and the recognition model
//! * `weights` - weight file resolution for ONNX Runtime and Candle

pub mod detection;
#[cfg(feature = "candle")]
mod layers;
pub mod recognition;
pub mod weights;

pub use detection::{DetectionEngine, DoctrDetectionModel};
pub use recognition::{DoctrRecognitionModel, RecognitionEngine};
