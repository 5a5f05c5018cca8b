//! Tensor type aliases shared by the preprocessing, inference and decoding stages.

/// A 3-dimensional tensor, `(batch, sequence, classes)`.
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4-dimensional tensor, `(batch, channels, height, width)`.
pub type Tensor4D = ndarray::Array4<f32>;
