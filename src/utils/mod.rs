//! Image utilities shared by the predictors and the demo.

pub mod image;

pub use image::{crop_relative, load_image, rotate_image};
