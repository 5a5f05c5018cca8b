//! docTR model zoo: default configurations per architecture.
//!
//! The weights only make sense together with the preprocessing and
//! post-processing settings they were trained with; this module is the single
//! place where those settings live.

use crate::core::{OCRError, OcrResult};
use crate::domain::vocabs::DEFAULT_VOCAB;
use serde::{Deserialize, Serialize};

/// Mean used by every pretrained docTR detection model.
pub const DETECTION_MEAN: [f32; 3] = [0.798, 0.785, 0.772];
/// Standard deviation used by every pretrained docTR detection model.
pub const DETECTION_STD: [f32; 3] = [0.264, 0.2749, 0.287];
/// Mean used by every pretrained docTR recognition model.
pub const RECOGNITION_MEAN: [f32; 3] = [0.694, 0.695, 0.693];
/// Standard deviation used by every pretrained docTR recognition model.
pub const RECOGNITION_STD: [f32; 3] = [0.299, 0.296, 0.301];

/// Detection architectures known to the zoo.
pub const DETECTION_ARCHS: &[&str] = &[
    "db_resnet34",
    "db_resnet50",
    "db_mobilenet_v3_large",
    "linknet_resnet18",
    "linknet_resnet34",
    "linknet_resnet50",
    "fast_tiny",
    "fast_small",
    "fast_base",
];

/// Recognition architectures known to the zoo.
pub const RECOGNITION_ARCHS: &[&str] = &[
    "crnn_vgg16_bn",
    "crnn_mobilenet_v3_small",
    "crnn_mobilenet_v3_large",
    "sar_resnet31",
    "master",
    "vitstr_small",
    "vitstr_base",
    "parseq",
];

/// Post-processing family of a detection architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionFamily {
    /// Differentiable binarization.
    Db,
    /// LinkNet segmentation head.
    LinkNet,
    /// FAST kernel head.
    Fast,
}

/// How a recognition head's per-step logits are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionDecoding {
    /// Connectionist temporal classification; the blank is the last class.
    Ctc,
    /// Autoregressive heads that emit an end-of-sequence token after the vocabulary.
    EndOfSequence,
}

/// Default configuration of a detection architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionArchConfig {
    pub name: String,
    pub family: DetectionFamily,
    /// `[C, H, W]`
    pub input_shape: [usize; 3],
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Probability threshold used to binarize the segmentation map.
    pub bin_thresh: f32,
    /// Minimum mean probability for a box to be kept.
    pub box_thresh: f32,
    pub unclip_ratio: f32,
    pub batch_size: usize,
    pub preserve_aspect_ratio: bool,
    pub symmetric_pad: bool,
}

/// Default configuration of a recognition architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionArchConfig {
    pub name: String,
    /// `[C, H, W]`
    pub input_shape: [usize; 3],
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Name of the vocabulary in [`crate::domain::vocabs`].
    pub vocab_name: String,
    pub decoding: RecognitionDecoding,
    pub batch_size: usize,
}

/// Resolves the default configuration of a detection architecture.
pub fn detection_arch(name: &str) -> OcrResult<DetectionArchConfig> {
    let (family, bin_thresh, unclip_ratio) = match name {
        "db_resnet34" | "db_resnet50" | "db_mobilenet_v3_large" => (DetectionFamily::Db, 0.3, 1.5),
        "linknet_resnet18" | "linknet_resnet34" | "linknet_resnet50" => {
            (DetectionFamily::LinkNet, 0.1, 1.5)
        }
        "fast_tiny" | "fast_small" | "fast_base" => (DetectionFamily::Fast, 0.1, 1.0),
        _ => return Err(unknown_architecture(name)),
    };
    Ok(DetectionArchConfig {
        name: name.to_string(),
        family,
        input_shape: [3, 1024, 1024],
        mean: DETECTION_MEAN,
        std: DETECTION_STD,
        bin_thresh,
        box_thresh: 0.1,
        unclip_ratio,
        batch_size: 2,
        preserve_aspect_ratio: true,
        symmetric_pad: true,
    })
}

/// Resolves the default configuration of a recognition architecture.
pub fn recognition_arch(name: &str) -> OcrResult<RecognitionArchConfig> {
    let decoding = match name {
        "crnn_vgg16_bn" | "crnn_mobilenet_v3_small" | "crnn_mobilenet_v3_large" => {
            RecognitionDecoding::Ctc
        }
        "sar_resnet31" | "master" | "vitstr_small" | "vitstr_base" | "parseq" => {
            RecognitionDecoding::EndOfSequence
        }
        _ => return Err(unknown_architecture(name)),
    };
    Ok(RecognitionArchConfig {
        name: name.to_string(),
        input_shape: [3, 32, 128],
        mean: RECOGNITION_MEAN,
        std: RECOGNITION_STD,
        vocab_name: DEFAULT_VOCAB.to_string(),
        decoding,
        batch_size: 32,
    })
}

fn unknown_architecture(name: &str) -> OCRError {
    OCRError::config_error(format!("unknown architecture '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_detection_arch_resolves() {
        for name in DETECTION_ARCHS {
            let cfg = detection_arch(name).unwrap();
            assert_eq!(cfg.input_shape, [3, 1024, 1024]);
            assert_eq!(cfg.box_thresh, 0.1);
        }
    }

    #[test]
    fn test_every_listed_recognition_arch_resolves() {
        for name in RECOGNITION_ARCHS {
            let cfg = recognition_arch(name).unwrap();
            assert_eq!(cfg.input_shape, [3, 32, 128]);
            assert_eq!(cfg.batch_size, 32);
        }
    }

    #[test]
    fn test_family_specific_thresholds() {
        assert_eq!(detection_arch("db_resnet50").unwrap().bin_thresh, 0.3);
        assert_eq!(detection_arch("linknet_resnet18").unwrap().bin_thresh, 0.1);
        assert_eq!(detection_arch("fast_base").unwrap().unclip_ratio, 1.0);
        assert_eq!(
            recognition_arch("crnn_vgg16_bn").unwrap().decoding,
            RecognitionDecoding::Ctc
        );
        assert_eq!(
            recognition_arch("parseq").unwrap().decoding,
            RecognitionDecoding::EndOfSequence
        );
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        let err = recognition_arch("crnn_resnet9000").unwrap_err();
        assert!(err.to_string().contains("unknown architecture 'crnn_resnet9000'"));
        assert!(detection_arch("yolo").is_err());
    }
}
