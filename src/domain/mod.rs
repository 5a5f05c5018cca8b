//! Domain types: result records, categories and the docTR model zoo.

pub mod architecture;
pub mod detection_result;
pub mod vocabs;

pub use architecture::{
    DetectionArchConfig, DetectionFamily, RecognitionArchConfig, RecognitionDecoding,
    detection_arch, recognition_arch,
};
pub use detection_result::{Categories, DetectionResult, LayoutType, ObjectTypes, PageType};
