//! Text recognition networks.

#[cfg(feature = "candle")]
mod crnn_vgg16_bn;
mod engine;
mod model;

#[cfg(feature = "candle")]
pub use crnn_vgg16_bn::CrnnVgg16Bn;
pub use engine::RecognitionEngine;
pub use model::DoctrRecognitionModel;
