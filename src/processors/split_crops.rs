//! Splitting of very wide text crops and merging of their predictions.
//!
//! A recognition network sees a fixed `32 x 128` input. A line much wider
//! than that would be squeezed beyond recognition, so it is cut into
//! overlapping pieces that are read separately and stitched back together.

use image::{RgbImage, imageops};

/// Crops wider than this aspect ratio are split.
pub const MAX_ASPECT_RATIO: f32 = 8.0;
/// Aspect ratio aimed for when choosing the number of pieces.
pub const TARGET_ASPECT_RATIO: f32 = 6.0;
/// Widening factor applied to every piece so that neighbours overlap.
pub const DILATION: f32 = 1.4;

/// Where the prediction(s) of an input crop live in the flattened piece list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropSlot {
    /// The crop was kept as is.
    Single(usize),
    /// The crop was split into pieces `start..end`.
    Split(std::ops::Range<usize>),
}

/// Splits crops whose aspect ratio exceeds `max_ratio`.
///
/// Returns the flattened pieces, one slot per input crop, and whether any
/// crop was split.
pub fn split_crops(
    crops: &[RgbImage],
    max_ratio: f32,
    target_ratio: f32,
    dilation: f32,
) -> (Vec<RgbImage>, Vec<CropSlot>, bool) {
    let mut pieces = Vec::with_capacity(crops.len());
    let mut slots = Vec::with_capacity(crops.len());
    let mut remap_required = false;

    for crop in crops {
        let (w, h) = crop.dimensions();
        let aspect_ratio = if h == 0 { 0.0 } else { w as f32 / h as f32 };
        if aspect_ratio <= max_ratio {
            slots.push(CropSlot::Single(pieces.len()));
            pieces.push(crop.clone());
            continue;
        }

        let num_subcrops = (aspect_ratio / target_ratio).floor().max(1.0) as usize;
        let width = dilation * w as f32 / num_subcrops as f32;
        let start = pieces.len();
        for idx in 0..num_subcrops {
            let center = (w as f32 / num_subcrops as f32) * (0.5 + idx as f32);
            let x0 = (center - width / 2.0).round().max(0.0) as u32;
            let x1 = ((center + width / 2.0).round().max(0.0) as u32).min(w - 1);
            if x1 <= x0 {
                continue;
            }
            pieces.push(imageops::crop_imm(crop, x0, 0, x1 - x0, h).to_image());
        }
        slots.push(CropSlot::Split(start..pieces.len()));
        remap_required = true;
    }

    (pieces, slots, remap_required)
}

/// Puts piece predictions back into one prediction per input crop.
///
/// Split crops get their texts merged and the lowest of their confidences.
pub fn remap_predictions(
    predictions: &[(String, f32)],
    slots: &[CropSlot],
    dilation: f32,
) -> Vec<(String, f32)> {
    slots
        .iter()
        .map(|slot| match slot {
            CropSlot::Single(i) => predictions[*i].clone(),
            CropSlot::Split(range) => {
                let parts = &predictions[range.clone()];
                let texts: Vec<&str> = parts.iter().map(|(t, _)| t.as_str()).collect();
                let confidence = parts
                    .iter()
                    .map(|(_, c)| *c)
                    .fold(f32::INFINITY, f32::min);
                let confidence = if parts.is_empty() { 0.0 } else { confidence };
                (merge_multi_strings(&texts, dilation), confidence)
            }
        })
        .collect()
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Merges two overlapping readings of neighbouring pieces.
///
/// Every overlap length `i` is scored by the normalized edit distance between
/// the last `i` characters of `a` and the first `i` of `b`; the best one
/// wins. When the two strings start with a run of perfect matches (a split
/// inside repeated characters), the overlap is bounded by the geometric
/// overlap implied by `dilation`.
pub fn merge_strings(a: &str, b: &str, dilation: f32) -> String {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let seq_len = a_chars.len().min(b_chars.len());
    if seq_len == 0 {
        return if a_chars.is_empty() { b.to_string() } else { a.to_string() };
    }

    let scores: Vec<f32> = (1..=seq_len)
        .map(|i| levenshtein(&a_chars[a_chars.len() - i..], &b_chars[..i]) as f32 / i as f32)
        .collect();

    let index = if scores.len() > 1 && scores[0] == 0.0 && scores[1] == 0.0 {
        let n_overlap =
            (b_chars.len() as f32 * (dilation - 1.0) / dilation).round_ties_even() as usize;
        let n_zeros = scores.iter().filter(|s| **s == 0.0).count();
        n_zeros.min(n_overlap)
    } else {
        let mut min_score = 1.0f32;
        let mut index = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score < min_score {
                min_score = *score;
                index = i + 1;
            }
        }
        index
    };

    if index == 0 {
        return format!("{a}{b}");
    }
    let head: String = a_chars[..a_chars.len() - 1].iter().collect();
    let tail: String = b_chars[index - 1..].iter().collect();
    head + &tail
}

/// Folds [`merge_strings`] over the readings of all pieces, left to right.
pub fn merge_multi_strings(parts: &[&str], dilation: f32) -> String {
    parts
        .iter()
        .fold(String::new(), |acc, part| merge_strings(&acc, part, dilation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_levenshtein() {
        let d = |a: &str, b: &str| {
            levenshtein(
                &a.chars().collect::<Vec<_>>(),
                &b.chars().collect::<Vec<_>>(),
            )
        };
        assert_eq!(d("kitten", "sitting"), 3);
        assert_eq!(d("", "abc"), 3);
        assert_eq!(d("abc", "abc"), 0);
    }

    #[test]
    fn test_merge_strings_on_overlap() {
        assert_eq!(merge_strings("abcd", "cdefgh", 1.4), "abcdefgh");
        assert_eq!(merge_strings("abcd", "xyz", 1.4), "abcdxyz");
        assert_eq!(merge_strings("", "xyz", 1.4), "xyz");
        assert_eq!(merge_strings("abc", "", 1.4), "abc");
    }

    #[test]
    fn test_merge_strings_inside_repetitions() {
        // "aaa" overlapping "aaab": bounded by the geometric overlap of round(4 * 0.4 / 1.4) = 1.
        assert_eq!(merge_strings("aaa", "aaab", 1.4), "aaaaab");
    }

    #[test]
    fn test_merge_strings_overlap_rounds_half_to_even() {
        // round(5 * 1.0 / 2.0) = round(2.5) = 2
        assert_eq!(merge_strings("xaaaa", "aaaaa", 2.0), "xaaaaaaa");
    }

    #[test]
    fn test_merge_multi_strings() {
        assert_eq!(
            merge_multi_strings(&["this is a", "a long", "ng sentence"], 1.4),
            "this is a long sentence"
        );
    }

    #[test]
    fn test_narrow_crops_are_left_alone() {
        let crops = vec![RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]))];
        let (pieces, slots, remap) = split_crops(&crops, MAX_ASPECT_RATIO, TARGET_ASPECT_RATIO, DILATION);
        assert_eq!(pieces.len(), 1);
        assert_eq!(slots, vec![CropSlot::Single(0)]);
        assert!(!remap);
    }

    #[test]
    fn test_wide_crop_is_split_with_overlap() {
        // Aspect ratio 20 -> floor(20 / 6) = 3 pieces.
        let crops = vec![
            RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])),
            RgbImage::from_pixel(600, 30, Rgb([255, 255, 255])),
        ];
        let (pieces, slots, remap) = split_crops(&crops, MAX_ASPECT_RATIO, TARGET_ASPECT_RATIO, DILATION);
        assert!(remap);
        assert_eq!(slots, vec![CropSlot::Single(0), CropSlot::Split(1..4)]);
        assert_eq!(pieces.len(), 4);
        // width = 1.4 * 600 / 3 = 280, first piece clipped at 0: [0, 240)
        assert_eq!(pieces[1].dimensions(), (240, 30));
        assert_eq!(pieces[2].dimensions(), (280, 30));
        // last piece ends at w - 1
        assert_eq!(pieces[3].dimensions(), (239, 30));
    }

    #[test]
    fn test_remap_predictions() {
        let predictions = vec![
            ("solo".to_string(), 0.9),
            ("hello wo".to_string(), 0.8),
            ("world".to_string(), 0.7),
        ];
        let slots = vec![CropSlot::Single(0), CropSlot::Split(1..3)];
        let merged = remap_predictions(&predictions, &slots, DILATION);
        assert_eq!(merged[0], ("solo".to_string(), 0.9));
        assert_eq!(merged[1].0, "hello world");
        assert!((merged[1].1 - 0.7).abs() < 1e-6);
    }
}
