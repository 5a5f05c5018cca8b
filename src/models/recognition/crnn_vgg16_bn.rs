//! CRNN with a VGG-16-BN backbone, ported to Candle.
//!
//! The backbone is torchvision's `vgg16_bn().features` with the last three
//! max-pools made rectangular (`2 x 1`), so a `32 x 128` crop becomes a
//! sequence of 32 columns. A two-layer bidirectional LSTM and a linear layer
//! produce `|vocab| + 1` CTC logits per column. Weight names follow docTR's
//! PyTorch state dict (`feat_extractor.*`, `decoder.*`, `linear.*`).

use crate::core::{InferenceEngine, OCRError, Tensor3D, Tensor4D};
use crate::models::layers::{ConvBn, candle_to_ocr_inference, to_candle, to_tensor3d};
use candle_core::{D, Device, Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder};

const MODEL_NAME: &str = "crnn_vgg16_bn";
const RNN_UNITS: usize = 128;

/// VGG-16 layout: output channels, `None` for a max-pool.
const VGG16: [Option<usize>; 18] = [
    Some(64),
    Some(64),
    None,
    Some(128),
    Some(128),
    None,
    Some(256),
    Some(256),
    Some(256),
    None,
    Some(512),
    Some(512),
    Some(512),
    None,
    Some(512),
    Some(512),
    Some(512),
    None,
];
const RECTANGULAR_POOLS: usize = 3;

#[derive(Debug, Clone)]
enum VggLayer {
    Conv(ConvBn),
    Pool { kernel: (usize, usize) },
}

#[derive(Debug, Clone)]
struct Vgg16Bn {
    layers: Vec<VggLayer>,
}

impl Vgg16Bn {
    fn load(vb: VarBuilder) -> Result<Self> {
        let total_pools = VGG16.iter().filter(|l| l.is_none()).count();
        let mut layers = Vec::with_capacity(VGG16.len());
        let mut in_channels = 3;
        // Index inside the `features` Sequential: conv, bn, relu or a single pool.
        let mut index = 0;
        let mut pools_seen = 0;
        for layer in VGG16 {
            match layer {
                Some(out_channels) => {
                    layers.push(VggLayer::Conv(ConvBn::load(
                        in_channels,
                        out_channels,
                        3,
                        1,
                        1,
                        true,
                        &index.to_string(),
                        &(index + 1).to_string(),
                        vb.clone(),
                    )?));
                    in_channels = out_channels;
                    index += 3;
                }
                None => {
                    pools_seen += 1;
                    let kernel = if pools_seen > total_pools - RECTANGULAR_POOLS {
                        (2, 1)
                    } else {
                        (2, 2)
                    };
                    layers.push(VggLayer::Pool { kernel });
                    index += 1;
                }
            }
        }
        Ok(Self { layers })
    }
}

impl Module for Vgg16Bn {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for layer in &self.layers {
            x = match layer {
                VggLayer::Conv(conv) => conv.forward(&x)?.relu()?,
                VggLayer::Pool { kernel } => x.max_pool2d_with_stride(*kernel, *kernel)?,
            };
        }
        Ok(x)
    }
}

/// One direction of one LSTM layer, in PyTorch's `i, f, g, o` gate order.
#[derive(Debug, Clone)]
struct LstmDirection {
    w_ih: Tensor,
    w_hh: Tensor,
    bias: Tensor,
    reverse: bool,
}

impl LstmDirection {
    fn load(input: usize, layer: usize, reverse: bool, vb: &VarBuilder) -> Result<Self> {
        let suffix = if reverse { "_reverse" } else { "" };
        let gates = 4 * RNN_UNITS;
        let w_ih = vb.get((gates, input), &format!("weight_ih_l{layer}{suffix}"))?;
        let w_hh = vb.get((gates, RNN_UNITS), &format!("weight_hh_l{layer}{suffix}"))?;
        let b_ih = vb.get(gates, &format!("bias_ih_l{layer}{suffix}"))?;
        let b_hh = vb.get(gates, &format!("bias_hh_l{layer}{suffix}"))?;
        Ok(Self {
            w_ih: w_ih.t()?.contiguous()?,
            w_hh: w_hh.t()?.contiguous()?,
            bias: (b_ih + b_hh)?,
            reverse,
        })
    }

    /// `(N, T, input)` to `(N, T, RNN_UNITS)`.
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, steps, _) = x.dims3()?;
        let projected = x.broadcast_matmul(&self.w_ih)?.broadcast_add(&self.bias)?;
        let mut h = Tensor::zeros((batch, RNN_UNITS), x.dtype(), x.device())?;
        let mut c = h.clone();
        let mut outputs: Vec<Tensor> = Vec::with_capacity(steps);

        let order: Vec<usize> = if self.reverse {
            (0..steps).rev().collect()
        } else {
            (0..steps).collect()
        };
        for t in order {
            let gates = (projected.narrow(1, t, 1)?.squeeze(1)? + h.matmul(&self.w_hh)?)?;
            let chunks = gates.chunk(4, D::Minus1)?;
            let i = candle_nn::ops::sigmoid(&chunks[0])?;
            let f = candle_nn::ops::sigmoid(&chunks[1])?;
            let g = chunks[2].tanh()?;
            let o = candle_nn::ops::sigmoid(&chunks[3])?;
            c = ((f * &c)? + (i * g)?)?;
            h = (o * c.tanh()?)?;
            outputs.push(h.clone());
        }
        if self.reverse {
            outputs.reverse();
        }
        Tensor::stack(&outputs, 1)
    }
}

#[derive(Debug, Clone)]
struct BiLstm {
    layers: Vec<(LstmDirection, LstmDirection)>,
}

impl BiLstm {
    fn load(input: usize, num_layers: usize, vb: VarBuilder) -> Result<Self> {
        let layers = (0..num_layers)
            .map(|layer| {
                let input = if layer == 0 { input } else { 2 * RNN_UNITS };
                Ok((
                    LstmDirection::load(input, layer, false, &vb)?,
                    LstmDirection::load(input, layer, true, &vb)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layers })
    }
}

impl Module for BiLstm {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for (forward, backward) in &self.layers {
            x = Tensor::cat(&[forward.forward(&x)?, backward.forward(&x)?], D::Minus1)?;
        }
        Ok(x)
    }
}

/// CRNN-VGG16-BN returning `(N, T, |vocab| + 1)` logits.
#[derive(Debug)]
pub struct CrnnVgg16Bn {
    feat_extractor: Vgg16Bn,
    decoder: BiLstm,
    linear: Linear,
    device: Device,
}

impl CrnnVgg16Bn {
    /// Builds the network for a `[C, H, W]` input and a vocabulary of `vocab_size` characters.
    pub fn load(input_shape: [usize; 3], vocab_size: usize, vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let feat_extractor = Vgg16Bn::load(vb.pp("feat_extractor"))?;
        // Every one of the five pools halves the height.
        let feat_height = input_shape[1] >> 5;
        let lstm_input = 512 * feat_height.max(1);
        Ok(Self {
            feat_extractor,
            decoder: BiLstm::load(lstm_input, 2, vb.pp("decoder"))?,
            linear: candle_nn::linear(2 * RNN_UNITS, vocab_size + 1, vb.pp("linear"))?,
            device,
        })
    }

    fn forward_tensor(&self, x: &Tensor) -> Result<Tensor> {
        let features = self.feat_extractor.forward(x)?;
        let (n, c, h, w) = features.dims4()?;
        // (N, C, H, W) -> (N, W, C * H)
        let sequence = features.reshape((n, c * h, w))?.transpose(1, 2)?.contiguous()?;
        let decoded = self.decoder.forward(&sequence)?;
        self.linear.forward(&decoded)
    }
}

impl InferenceEngine for CrnnVgg16Bn {
    type Input = Tensor4D;
    type Output = Tensor3D;

    fn infer(&self, input: &Self::Input) -> std::result::Result<Self::Output, OCRError> {
        let logits = to_candle(input, &self.device)
            .and_then(|x| self.forward_tensor(&x))
            .map_err(|e| {
                candle_to_ocr_inference(
                    MODEL_NAME,
                    format!("forward pass failed for batch of shape {:?}", input.shape()),
                    e,
                )
            })?;
        to_tensor3d(MODEL_NAME, &logits)
    }

    fn engine_info(&self) -> String {
        format!("Candle({MODEL_NAME}, {:?})", self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_sequence_length_and_classes() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = CrnnVgg16Bn::load([3, 32, 128], 10, vb).unwrap();
        let logits = model.infer(&Tensor4D::zeros((2, 3, 32, 128))).unwrap();
        assert_eq!(logits.shape(), &[2, 32, 11]);
    }
}
