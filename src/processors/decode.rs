//! Decoding of recognition logits into text and confidence.

use crate::core::Tensor3D;
use crate::domain::architecture::RecognitionDecoding;
use ndarray::{ArrayView1, Axis};

/// Index and softmax probability of the most likely class.
fn best_class(logits: ArrayView1<f32>) -> (usize, f32) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let denom: f32 = logits.iter().map(|v| (v - max).exp()).sum();
    let (idx, _) = logits
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv { (i, v) } else { (bi, bv) }
        });
    (idx, 1.0 / denom)
}

/// Greedy CTC decoding; the blank is the class right after the vocabulary.
#[derive(Debug, Clone)]
pub struct CtcDecoder {
    vocab: Vec<char>,
}

impl CtcDecoder {
    pub fn new(vocab: Vec<char>) -> Self {
        Self { vocab }
    }

    pub fn blank(&self) -> usize {
        self.vocab.len()
    }

    /// Decodes `(N, T, C)` logits.
    ///
    /// Repeats are collapsed before blanks are dropped. The confidence is the
    /// lowest best-class probability over all timesteps.
    pub fn decode(&self, logits: &Tensor3D) -> Vec<(String, f32)> {
        logits
            .axis_iter(Axis(0))
            .map(|sequence| {
                let mut text = String::new();
                let mut confidence = 1.0f32;
                let mut previous: Option<usize> = None;
                for step in sequence.axis_iter(Axis(0)) {
                    let (idx, prob) = best_class(step);
                    confidence = confidence.min(prob);
                    if previous != Some(idx)
                        && idx != self.blank()
                        && let Some(&c) = self.vocab.get(idx)
                    {
                        text.push(c);
                    }
                    previous = Some(idx);
                }
                if sequence.is_empty() {
                    confidence = 0.0;
                }
                (text, confidence)
            })
            .collect()
    }
}

/// Argmax decoding for autoregressive heads, cut at the end-of-sequence token.
#[derive(Debug, Clone)]
pub struct EosDecoder {
    vocab: Vec<char>,
}

impl EosDecoder {
    pub fn new(vocab: Vec<char>) -> Self {
        Self { vocab }
    }

    pub fn eos(&self) -> usize {
        self.vocab.len()
    }

    /// Decodes `(N, T, C)` logits.
    ///
    /// Any class outside the vocabulary (end-of-sequence, start or padding
    /// tokens) stops the word. The confidence is the lowest best-class
    /// probability over the kept steps and the stopping step.
    pub fn decode(&self, logits: &Tensor3D) -> Vec<(String, f32)> {
        logits
            .axis_iter(Axis(0))
            .map(|sequence| {
                let mut text = String::new();
                let mut confidence = 1.0f32;
                for step in sequence.axis_iter(Axis(0)) {
                    let (idx, prob) = best_class(step);
                    confidence = confidence.min(prob);
                    match self.vocab.get(idx) {
                        Some(&c) if idx < self.eos() => text.push(c),
                        _ => break,
                    }
                }
                if sequence.is_empty() {
                    confidence = 0.0;
                }
                (text, confidence)
            })
            .collect()
    }
}

/// Decoder matching a recognition architecture.
#[derive(Debug, Clone)]
pub enum TextDecoder {
    Ctc(CtcDecoder),
    Eos(EosDecoder),
}

impl TextDecoder {
    pub fn new(decoding: RecognitionDecoding, vocab: Vec<char>) -> Self {
        match decoding {
            RecognitionDecoding::Ctc => Self::Ctc(CtcDecoder::new(vocab)),
            RecognitionDecoding::EndOfSequence => Self::Eos(EosDecoder::new(vocab)),
        }
    }

    pub fn decode(&self, logits: &Tensor3D) -> Vec<(String, f32)> {
        match self {
            Self::Ctc(d) => d.decode(logits),
            Self::Eos(d) => d.decode(logits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// One-hot-ish logits for the given class indices.
    fn logits_for(indices: &[usize], classes: usize) -> Tensor3D {
        let mut logits = Array3::from_elem((1, indices.len(), classes), 0.0f32);
        for (t, &i) in indices.iter().enumerate() {
            logits[[0, t, i]] = 10.0;
        }
        logits
    }

    #[test]
    fn test_ctc_collapses_repeats_and_drops_blanks() {
        let decoder = CtcDecoder::new("ablo".chars().collect());
        // b b a l l <blank> l o <blank>
        let logits = logits_for(&[1, 1, 0, 2, 2, 4, 2, 3, 4], 5);
        let decoded = decoder.decode(&logits);
        assert_eq!(decoded[0].0, "ballo");
        assert!(decoded[0].1 > 0.99);
    }

    #[test]
    fn test_ctc_confidence_is_the_weakest_step() {
        let decoder = CtcDecoder::new("ab".chars().collect());
        // <blank> b
        let mut logits = logits_for(&[2, 1], 3);
        // Make the second step uncertain between 'b' and blank.
        logits[[0, 1, 1]] = 1.0;
        logits[[0, 1, 2]] = 1.0;
        let (text, conf) = &decoder.decode(&logits)[0];
        assert_eq!(text, "b");
        assert!(*conf < 0.6 && *conf > 0.4);
    }

    #[test]
    fn test_eos_stops_at_end_token() {
        let decoder = EosDecoder::new("abc".chars().collect());
        let logits = logits_for(&[2, 0, 3, 1, 1], 4);
        let decoded = decoder.decode(&logits);
        assert_eq!(decoded[0].0, "ca");
        assert!(decoded[0].1 > 0.99);
    }

    #[test]
    fn test_eos_treats_special_tokens_as_stop() {
        let decoder = TextDecoder::new(RecognitionDecoding::EndOfSequence, vec!['x']);
        // index 2 is a start/pad token after <eos>
        let logits = logits_for(&[0, 2, 0], 4);
        assert_eq!(decoder.decode(&logits)[0].0, "x");
    }

    #[test]
    fn test_batch_order_is_preserved() {
        let decoder = TextDecoder::new(RecognitionDecoding::Ctc, vec!['a', 'b']);
        let mut logits = Array3::from_elem((2, 2, 3), 0.0f32);
        logits[[0, 0, 0]] = 10.0;
        logits[[0, 1, 2]] = 10.0;
        logits[[1, 0, 1]] = 10.0;
        logits[[1, 1, 2]] = 10.0;
        let decoded = decoder.decode(&logits);
        assert_eq!(decoded[0].0, "a");
        assert_eq!(decoded[1].0, "b");
    }
}
