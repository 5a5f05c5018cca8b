//! Image processing around the docTR networks.
//!
//! # Modules
//!
//! * `normalization` - Resizing, padding and channel normalization of network inputs
//! * `db_postprocess` - Probability map to relative text boxes
//! * `decode` - CTC and end-of-sequence decoding of recognition logits
//! * `split_crops` - Splitting of wide crops and merging of their readings
//! * `orientation` - Page skew estimation from text line directions
//! * `geometry` - Polygons and minimum-area rectangles

pub mod db_postprocess;
mod decode;
mod geometry;
mod normalization;
pub mod orientation;
pub mod split_crops;

pub use db_postprocess::{DbPostProcessor, RelativeBox};
pub use decode::{CtcDecoder, EosDecoder, TextDecoder};
pub use geometry::{MinAreaRect, Point, Polygon, Rect};
pub use normalization::{ContentWindow, DoctrPreProcessor};
pub use orientation::{
    DEFAULT_NUMBER_CONTOURS, DEFAULT_RATIO_THRESHOLD_FOR_LINES, estimate_orientation,
};
pub use split_crops::{CropSlot, merge_multi_strings, merge_strings, remap_predictions, split_crops};
