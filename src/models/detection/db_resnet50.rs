//! DBNet with a ResNet-50 backbone, ported to Candle.
//!
//! Layer names follow docTR's PyTorch `db_resnet50` state dict
//! (`feat_extractor.*`, `fpn.*`, `prob_head.*`), so its checkpoints load
//! without renaming. Only the probability head is built; the threshold head
//! is a training-time branch.

use crate::core::{InferenceEngine, OCRError, Tensor4D};
use crate::models::layers::{
    ConvBn, FrozenBatchNorm, candle_to_ocr_inference, max_pool_3x3_s2, resize_bilinear,
    to_candle, to_tensor4d, upconv2x,
};
use candle_core::{Device, Module, Result, Tensor};
use candle_nn::{ConvTranspose2d, VarBuilder};

const MODEL_NAME: &str = "db_resnet50";
const FPN_CHANNELS: usize = 256;

#[derive(Debug, Clone)]
struct Bottleneck {
    conv1: ConvBn,
    conv2: ConvBn,
    conv3: ConvBn,
    downsample: Option<ConvBn>,
}

impl Bottleneck {
    fn load(in_channels: usize, planes: usize, stride: usize, vb: VarBuilder) -> Result<Self> {
        let out_channels = planes * 4;
        let conv1 = ConvBn::load(in_channels, planes, 1, 1, 0, false, "conv1", "bn1", vb.clone())?;
        let conv2 = ConvBn::load(planes, planes, 3, stride, 1, false, "conv2", "bn2", vb.clone())?;
        let conv3 = ConvBn::load(planes, out_channels, 1, 1, 0, false, "conv3", "bn3", vb.clone())?;
        let downsample = if stride != 1 || in_channels != out_channels {
            Some(ConvBn::load(
                in_channels,
                out_channels,
                1,
                stride,
                0,
                false,
                "0",
                "1",
                vb.pp("downsample"),
            )?)
        } else {
            None
        };
        Ok(Self {
            conv1,
            conv2,
            conv3,
            downsample,
        })
    }
}

impl Module for Bottleneck {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let out = self.conv1.forward(x)?.relu()?;
        let out = self.conv2.forward(&out)?.relu()?;
        let out = self.conv3.forward(&out)?;
        let identity = match &self.downsample {
            Some(ds) => ds.forward(x)?,
            None => x.clone(),
        };
        (out + identity)?.relu()
    }
}

/// torchvision ResNet-50 returning the outputs of its four stages.
#[derive(Debug, Clone)]
struct ResNet50 {
    stem: ConvBn,
    stages: Vec<Vec<Bottleneck>>,
}

impl ResNet50 {
    fn load(vb: VarBuilder) -> Result<Self> {
        let stem = ConvBn::load(3, 64, 7, 2, 3, false, "conv1", "bn1", vb.clone())?;
        let mut stages = Vec::with_capacity(4);
        let mut in_channels = 64;
        for (idx, (planes, blocks, stride)) in [(64, 3, 1), (128, 4, 2), (256, 6, 2), (512, 3, 2)]
            .into_iter()
            .enumerate()
        {
            let stage_vb = vb.pp(format!("layer{}", idx + 1));
            let mut stage = Vec::with_capacity(blocks);
            for block in 0..blocks {
                let block_stride = if block == 0 { stride } else { 1 };
                stage.push(Bottleneck::load(
                    in_channels,
                    planes,
                    block_stride,
                    stage_vb.pp(block.to_string()),
                )?);
                in_channels = planes * 4;
            }
            stages.push(stage);
        }
        Ok(Self { stem, stages })
    }

    fn features(&self, x: &Tensor) -> Result<Vec<Tensor>> {
        let mut x = max_pool_3x3_s2(&self.stem.forward(x)?.relu()?)?;
        let mut features = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            for block in stage {
                x = block.forward(&x)?;
            }
            features.push(x.clone());
        }
        Ok(features)
    }
}

#[derive(Debug, Clone)]
struct FeaturePyramid {
    in_branches: Vec<ConvBn>,
    out_branches: Vec<ConvBn>,
}

impl FeaturePyramid {
    fn load(in_channels: &[usize], vb: VarBuilder) -> Result<Self> {
        let in_branches = in_channels
            .iter()
            .enumerate()
            .map(|(idx, &chans)| {
                ConvBn::load(chans, FPN_CHANNELS, 1, 1, 0, false, "0", "1", vb.pp(format!("in_branches.{idx}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let out_branches = (0..in_channels.len())
            .map(|idx| {
                ConvBn::load(
                    FPN_CHANNELS,
                    FPN_CHANNELS / 4,
                    3,
                    1,
                    1,
                    false,
                    "0",
                    "1",
                    vb.pp(format!("out_branches.{idx}")),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            in_branches,
            out_branches,
        })
    }

    fn forward(&self, features: &[Tensor]) -> Result<Tensor> {
        let lateral = features
            .iter()
            .zip(&self.in_branches)
            .map(|(f, branch)| branch.forward(f)?.relu())
            .collect::<Result<Vec<_>>>()?;

        // Top-down pathway, coarsest level first.
        let mut merged = vec![lateral[lateral.len() - 1].clone()];
        for t in lateral[..lateral.len() - 1].iter().rev() {
            let (_, _, h, w) = t.dims4()?;
            let upsampled = resize_bilinear(&merged[merged.len() - 1], h, w)?;
            merged.push((upsampled + t)?);
        }
        merged.reverse();

        let (_, _, out_h, out_w) = merged[0].dims4()?;
        let outputs = merged
            .iter()
            .zip(&self.out_branches)
            .map(|(t, branch)| resize_bilinear(&branch.forward(t)?.relu()?, out_h, out_w))
            .collect::<Result<Vec<_>>>()?;
        Tensor::cat(&outputs, 1)
    }
}

#[derive(Debug, Clone)]
struct ProbabilityHead {
    conv: ConvBn,
    up1: ConvTranspose2d,
    bn1: FrozenBatchNorm,
    up2: ConvTranspose2d,
}

impl ProbabilityHead {
    fn load(vb: VarBuilder) -> Result<Self> {
        let mid = FPN_CHANNELS / 4;
        Ok(Self {
            conv: ConvBn::load(FPN_CHANNELS, mid, 3, 1, 1, false, "0", "1", vb.clone())?,
            up1: upconv2x(mid, mid, false, vb.pp("3"))?,
            bn1: FrozenBatchNorm::load(mid, vb.pp("4"))?,
            up2: upconv2x(mid, 1, true, vb.pp("6"))?,
        })
    }
}

impl Module for ProbabilityHead {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.conv.forward(x)?.relu()?;
        let x = self.bn1.forward(&self.up1.forward(&x)?)?.relu()?;
        self.up2.forward(&x)
    }
}

/// DBNet-ResNet50 returning `(N, 1, H, W)` probability logits.
#[derive(Debug)]
pub struct DbResNet50 {
    backbone: ResNet50,
    fpn: FeaturePyramid,
    prob_head: ProbabilityHead,
    device: Device,
}

impl DbResNet50 {
    pub fn load(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        Ok(Self {
            backbone: ResNet50::load(vb.pp("feat_extractor"))?,
            fpn: FeaturePyramid::load(&[256, 512, 1024, 2048], vb.pp("fpn"))?,
            prob_head: ProbabilityHead::load(vb.pp("prob_head"))?,
            device,
        })
    }

    fn forward_tensor(&self, x: &Tensor) -> Result<Tensor> {
        let features = self.backbone.features(x)?;
        let fused = self.fpn.forward(&features)?;
        self.prob_head.forward(&fused)
    }
}

impl InferenceEngine for DbResNet50 {
    type Input = Tensor4D;
    type Output = Tensor4D;

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
        to_tensor4d(MODEL_NAME, &logits)
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
    fn test_output_matches_input_resolution() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = DbResNet50::load(vb).unwrap();
        let input = Tensor4D::zeros((1, 3, 64, 64));
        let logits = model.infer(&input).unwrap();
        assert_eq!(logits.shape(), &[1, 1, 64, 64]);
    }
}
