//! Dimensional [`InferenceEngine`] adapters over [`OrtInfer`].

use crate::core::{InferenceEngine, OCRError, OrtInfer, Tensor3D, Tensor4D};

/// Detection graph returning a 4D probability-logit map.
#[derive(Debug)]
pub struct OrtInfer4D(OrtInfer);

impl OrtInfer4D {
    pub fn new(inner: OrtInfer) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> &OrtInfer {
        &self.0
    }
}

impl From<OrtInfer> for OrtInfer4D {
    fn from(inner: OrtInfer) -> Self {
        Self::new(inner)
    }
}

impl InferenceEngine for OrtInfer4D {
    type Input = Tensor4D;
    type Output = Tensor4D;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError> {
        self.0.infer_4d(input)
    }

    fn engine_info(&self) -> String {
        format!("ONNXRuntime-4D({})", self.0.model_name())
    }
}

/// Recognition graph returning per-step class logits.
#[derive(Debug)]
pub struct OrtInfer3D(OrtInfer);

impl OrtInfer3D {
    pub fn new(inner: OrtInfer) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> &OrtInfer {
        &self.0
    }
}

impl From<OrtInfer> for OrtInfer3D {
    fn from(inner: OrtInfer) -> Self {
        Self::new(inner)
    }
}

impl InferenceEngine for OrtInfer3D {
    type Input = Tensor4D;
    type Output = Tensor3D;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError> {
        self.0.infer_3d(input)
    }

    fn engine_info(&self) -> String {
        format!("ONNXRuntime-3D({})", self.0.model_name())
    }
}
