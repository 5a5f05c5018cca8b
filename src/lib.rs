//! # OAR docTR
//!
//! docTR OCR models behind the predictor interfaces of a document pipeline:
//! text-line detection, text recognition and page deskewing.
//!
//! ## Features
//!
//! - ONNX Runtime backend (feature `onnx`, default) for every docTR detection
//!   and recognition architecture exported to ONNX
//! - Candle backend (feature `candle`) with native `db_resnet50` and
//!   `crnn_vgg16_bn` ports that load docTR's PyTorch state dicts
//! - Backend selection from `USE_ORT` / `USE_ONNXRUNTIME` / `USE_CANDLE`
//! - CUDA execution (feature `cuda`)
//!
//! ## Modules
//!
//! * [`core`] - Backend selection, traits, configuration and error handling
//! * [`domain`] - Result records, categories and the docTR model zoo
//! * [`models`] - Networks, backend engines and weight loading
//! * [`predictors`] - Detector, recognizer and rotation transformer
//! * [`processors`] - Pre- and post-processing around the networks
//! * [`utils`] - Image loading, cropping and rotation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_doctr::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let page = load_image(Path::new("page.png"))?;
//!
//! // Level the page first.
//! let deskew = DocTrRotationTransformer::default();
//! let page = deskew.transform(&page, &deskew.predict(&page)?)?;
//!
//! let detector = DoctrTextlineDetector::new(
//!     "db_resnet50",
//!     "models/db_resnet50.onnx",
//!     Categories::text_lines(),
//!     None,
//!     None,
//! )?;
//! let recognizer =
//!     DoctrTextRecognizer::new("crnn_vgg16_bn", "models/crnn_vgg16_bn.onnx", None, None, None)?;
//!
//! let crops: Vec<(String, RgbImage)> = detector
//!     .predict(&page)?
//!     .iter()
//!     .enumerate()
//!     .filter_map(|(i, line)| Some((i.to_string(), crop_relative(&page, &line.bbox?)?)))
//!     .collect();
//! for word in recognizer.predict(&crops)? {
//!     println!("{:?}: {:?}", word.uuid, word.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod predictors;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_doctr::prelude::*;
/// ```
pub mod prelude {
    // Predictors and their interfaces
    pub use crate::core::traits::{ImageTransformer, ObjectDetector, PredictorBase, TextRecognizer};
    pub use crate::predictors::{DocTrRotationTransformer, DoctrTextRecognizer, DoctrTextlineDetector};

    // Backend selection
    pub use crate::core::{Backend, Device};

    // Results
    pub use crate::domain::{Categories, DetectionResult, LayoutType, ObjectTypes, PageType};

    // Error Handling
    pub use crate::core::{OCRError, OcrResult};

    // Images
    pub use crate::utils::{crop_relative, load_image, rotate_image};
    pub use image::RgbImage;
}
