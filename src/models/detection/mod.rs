//! Text detection networks.

#[cfg(feature = "candle")]
mod db_resnet50;
mod engine;
mod model;

#[cfg(feature = "candle")]
pub use db_resnet50::DbResNet50;
pub use engine::DetectionEngine;
pub use model::DoctrDetectionModel;
