use super::*;
use crate::core::errors::SimpleError;
use ndarray::{ArrayView3, ArrayView4};
use ort::value::TensorRef;

impl OrtInfer {
    /// Returns the configured or discovered output tensor name.
    fn get_output_name(&self) -> Result<String, OCRError> {
        if let Some(ref name) = self.output_name {
            return Ok(name.clone());
        }
        let session = self.sessions[0]
            .lock()
            .map_err(|_| OCRError::invalid_input("failed to acquire session lock"))?;
        session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| OCRError::invalid_input("graph declares no outputs"))
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn run_inference_with_processor<T>(
        &self,
        x: &Tensor4D,
        processor: impl FnOnce(&[i64], &[f32]) -> Result<T, OCRError>,
    ) -> Result<T, OCRError> {
        let input_shape = x.shape().to_vec();

        let output_name = self.get_output_name().map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "failed to get output name for model at '{}'",
                    self.model_path.display()
                ),
                e,
            )
        })?;

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "tensor_conversion",
                0,
                &input_shape,
                &format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self
            .next_idx
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("session lock acquisition failed"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "forward_pass",
                0,
                &input_shape,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    self.input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                OCRError::model_inference_error(
                    &self.model_name,
                    "output_extraction",
                    0,
                    &input_shape,
                    &format!("failed to extract output tensor '{output_name}' as f32"),
                    e,
                )
            })?;

        processor(output_shape, output_data)
    }

    fn output_dims(&self, output_shape: &[i64], rank: usize) -> Result<Vec<usize>, OCRError> {
        let dims: Vec<usize> = output_shape.iter().map(|&d| d.max(0) as usize).collect();
        if dims.len() != rank {
            return Err(OCRError::output_shape_error(&self.model_name, rank, &dims));
        }
        Ok(dims)
    }

    /// Runs a detection graph: `(N, C, H, W)` in, `(N, 1, H, W)` logits out.
    pub fn infer_4d(&self, x: &Tensor4D) -> Result<Tensor4D, OCRError> {
        self.run_inference_with_processor(x, |output_shape, output_data| {
            let dims = self.output_dims(output_shape, 4)?;
            let array_view =
                ArrayView4::from_shape((dims[0], dims[1], dims[2], dims[3]), output_data)
                    .map_err(OCRError::Tensor)?;
            Ok(array_view.to_owned())
        })
    }

    /// Runs a recognition graph: `(N, C, H, W)` in, `(N, T, C)` logits out.
    pub fn infer_3d(&self, x: &Tensor4D) -> Result<Tensor3D, OCRError> {
        self.run_inference_with_processor(x, |output_shape, output_data| {
            let dims = self.output_dims(output_shape, 3)?;
            let array_view = ArrayView3::from_shape((dims[0], dims[1], dims[2]), output_data)
                .map_err(OCRError::Tensor)?;
            Ok(array_view.to_owned())
        })
    }
}
