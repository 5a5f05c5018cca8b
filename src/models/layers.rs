//! Candle building blocks shared by the native network ports.

use crate::core::{OCRError, OcrResult, Tensor3D, Tensor4D};
use candle_core::{D, Device, Module, Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig, VarBuilder};

/// Wraps a Candle error raised while running `model_name`.
pub(crate) fn candle_to_ocr_inference(
    model_name: &str,
    context: impl Into<String>,
    err: candle_core::Error,
) -> OCRError {
    OCRError::Inference {
        model_name: model_name.to_string(),
        context: context.into(),
        source: Box::new(err),
    }
}

/// Batch normalization in inference mode, from `weight`, `bias`, `running_mean` and `running_var`.
#[derive(Debug, Clone)]
pub(crate) struct FrozenBatchNorm {
    scale: Tensor,
    shift: Tensor,
}

impl FrozenBatchNorm {
    pub(crate) fn load(channels: usize, vb: VarBuilder) -> Result<Self> {
        let weight = vb.get(channels, "weight")?;
        let bias = vb.get(channels, "bias")?;
        let mean = vb.get(channels, "running_mean")?;
        let var = vb.get(channels, "running_var")?;
        // y = (x - mean) / sqrt(var + eps) * weight + bias, folded into x * scale + shift
        let scale = weight.div(&(var + 1e-5)?.sqrt()?)?;
        let shift = bias.sub(&mean.mul(&scale)?)?;
        Ok(Self {
            scale: scale.reshape((1, channels, 1, 1))?,
            shift: shift.reshape((1, channels, 1, 1))?,
        })
    }
}

impl Module for FrozenBatchNorm {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        x.broadcast_mul(&self.scale)?.broadcast_add(&self.shift)
    }
}

/// Convolution followed by batch normalization, as `Sequential(conv, bn)` stores them.
#[derive(Debug, Clone)]
pub(crate) struct ConvBn {
    conv: Conv2d,
    bn: FrozenBatchNorm,
}

impl ConvBn {
    /// Loads `{conv}` and `{bn}` under `vb`, e.g. `conv1`/`bn1` or `0`/`1`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn load(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        bias: bool,
        conv_name: &str,
        bn_name: &str,
        vb: VarBuilder,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            stride,
            padding,
            ..Default::default()
        };
        let conv = if bias {
            candle_nn::conv2d(in_channels, out_channels, kernel_size, cfg, vb.pp(conv_name))?
        } else {
            candle_nn::conv2d_no_bias(in_channels, out_channels, kernel_size, cfg, vb.pp(conv_name))?
        };
        let bn = FrozenBatchNorm::load(out_channels, vb.pp(bn_name))?;
        Ok(Self { conv, bn })
    }
}

impl Module for ConvBn {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.bn.forward(&self.conv.forward(x)?)
    }
}

/// Stride-2, kernel-2 transposed convolution doubling the spatial size.
pub(crate) fn upconv2x(
    in_channels: usize,
    out_channels: usize,
    bias: bool,
    vb: VarBuilder,
) -> Result<ConvTranspose2d> {
    let cfg = ConvTranspose2dConfig {
        stride: 2,
        ..Default::default()
    };
    if bias {
        candle_nn::conv_transpose2d(in_channels, out_channels, 2, cfg, vb)
    } else {
        candle_nn::conv_transpose2d_no_bias(in_channels, out_channels, 2, cfg, vb)
    }
}

/// `(out, in)` matrix of 1D linear interpolation weights with aligned corners.
fn interpolation_matrix(input: usize, output: usize, device: &Device) -> Result<Tensor> {
    let mut weights = vec![0f32; output * input];
    let scale = if output > 1 {
        (input.saturating_sub(1)) as f32 / (output - 1) as f32
    } else {
        0.0
    };
    for i in 0..output {
        let src = i as f32 * scale;
        let i0 = (src.floor() as usize).min(input - 1);
        let i1 = (i0 + 1).min(input - 1);
        let frac = src - i0 as f32;
        weights[i * input + i0] += 1.0 - frac;
        weights[i * input + i1] += frac;
    }
    Tensor::from_vec(weights, (output, input), device)
}

/// Bilinear resize of a `(N, C, H, W)` tensor with `align_corners=True`.
pub(crate) fn resize_bilinear(x: &Tensor, out_h: usize, out_w: usize) -> Result<Tensor> {
    let (_, _, h, w) = x.dims4()?;
    if (h, w) == (out_h, out_w) {
        return Ok(x.clone());
    }
    let rows = interpolation_matrix(h, out_h, x.device())?;
    let cols = interpolation_matrix(w, out_w, x.device())?.t()?;
    let x = x.broadcast_matmul(&cols)?;
    rows.broadcast_matmul(&x)
}

/// 3x3, stride-2 max pooling with one pixel of padding, for non-negative inputs.
pub(crate) fn max_pool_3x3_s2(x: &Tensor) -> Result<Tensor> {
    x.pad_with_zeros(D::Minus2, 1, 1)?
        .pad_with_zeros(D::Minus1, 1, 1)?
        .max_pool2d_with_stride(3, 2)
}

pub(crate) fn to_candle(batch: &Tensor4D, device: &Device) -> Result<Tensor> {
    let shape = batch.shape().to_vec();
    let data: Vec<f32> = batch.iter().copied().collect();
    Tensor::from_vec(data, shape, device)
}

pub(crate) fn to_tensor4d(model_name: &str, x: &Tensor) -> OcrResult<Tensor4D> {
    let dims = x.dims4().map_err(|e| candle_to_ocr_inference(model_name, "expected a 4D output", e))?;
    let data = x
        .flatten_all()
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| candle_to_ocr_inference(model_name, "failed to read the output", e))?;
    Tensor4D::from_shape_vec(dims, data).map_err(|e| {
        OCRError::tensor_operation_error("to_tensor4d", &[dims.0, dims.1, dims.2, dims.3], &[], model_name, e)
    })
}

pub(crate) fn to_tensor3d(model_name: &str, x: &Tensor) -> OcrResult<Tensor3D> {
    let dims = x.dims3().map_err(|e| candle_to_ocr_inference(model_name, "expected a 3D output", e))?;
    let data = x
        .flatten_all()
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| candle_to_ocr_inference(model_name, "failed to read the output", e))?;
    Tensor3D::from_shape_vec(dims, data).map_err(|e| {
        OCRError::tensor_operation_error("to_tensor3d", &[dims.0, dims.1, dims.2], &[], model_name, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;
    use candle_core::DType;

    #[test]
    fn test_bilinear_resize_with_aligned_corners() {
        let x = Tensor::from_vec(vec![0f32, 1.0, 2.0, 3.0], (1, 1, 2, 2), &Device::Cpu).unwrap();
        let y = resize_bilinear(&x, 3, 3).unwrap();
        let values: Vec<f32> = y.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0.0, 0.5, 1.0, 1.0, 1.5, 2.0, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_max_pool_halves_size() {
        let x = Tensor::ones((1, 2, 8, 8), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(max_pool_3x3_s2(&x).unwrap().dims4().unwrap(), (1, 2, 4, 4));
    }

    #[test]
    fn test_frozen_batch_norm() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        // VarMap initializes missing statistics; the layer must still broadcast per channel.
        let bn = FrozenBatchNorm::load(3, vb).unwrap();
        let x = Tensor::zeros((2, 3, 4, 4), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(bn.forward(&x).unwrap().dims4().unwrap(), (2, 3, 4, 4));
    }

    #[test]
    fn test_ndarray_round_trip_keeps_layout() {
        let mut batch = Tensor4D::zeros((1, 2, 2, 3));
        batch[[0, 1, 0, 2]] = 7.0;
        let t = to_candle(&batch, &Device::Cpu).unwrap();
        let back = to_tensor4d("test", &t).unwrap();
        assert_eq!(back[[0, 1, 0, 2]], 7.0);
        assert_eq!(back.shape(), &[1, 2, 2, 3]);
    }
}
