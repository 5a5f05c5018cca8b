//! The pipeline's common result record and its category vocabulary.

use crate::core::{OCRError, OcrResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Layout categories produced by detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Word,
    Line,
    Text,
}

/// Page-level categories produced by image transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Angle,
}

/// Any category a predictor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectTypes {
    Layout(LayoutType),
    Page(PageType),
}

impl fmt::Display for ObjectTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectTypes::Layout(LayoutType::Word) => "word",
            ObjectTypes::Layout(LayoutType::Line) => "line",
            ObjectTypes::Layout(LayoutType::Text) => "text",
            ObjectTypes::Page(PageType::Angle) => "angle",
        };
        f.write_str(name)
    }
}

impl FromStr for ObjectTypes {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word" => Ok(LayoutType::Word.into()),
            "line" => Ok(LayoutType::Line.into()),
            "text" => Ok(LayoutType::Text.into()),
            "angle" => Ok(PageType::Angle.into()),
            other => Err(OCRError::config_error(format!("unknown category '{other}'"))),
        }
    }
}

impl From<LayoutType> for ObjectTypes {
    fn from(value: LayoutType) -> Self {
        ObjectTypes::Layout(value)
    }
}

impl From<PageType> for ObjectTypes {
    fn from(value: PageType) -> Self {
        ObjectTypes::Page(value)
    }
}

/// Mapping from model output label to category, e.g. `{"1": "word"}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(BTreeMap<u32, ObjectTypes>);

impl Categories {
    /// Creates a category mapping from `(label, category)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (u32, ObjectTypes)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// The single-class mapping every docTR text detector uses.
    pub fn text_lines() -> Self {
        Self::new([(1, LayoutType::Word.into())])
    }

    /// Parses a JSON mapping such as `{"1": "word"}`.
    pub fn from_json(json: &str) -> OcrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, class_id: u32) -> Option<ObjectTypes> {
        self.0.get(&class_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, ObjectTypes)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// A single prediction, shaped by the predictor that produced it.
///
/// Detectors fill `bbox`, `class_id`, `class_name` and `score`; recognizers
/// fill `text`, `score` and `uuid`; image transformers fill `angle`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// `[xmin, ymin, xmax, ymax]`
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<ObjectTypes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// `false` when `bbox` is expressed relative to the image size.
    pub absolute_coords: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Annotation id of the crop a recognition result belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Counter-clockwise rotation in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

impl DetectionResult {
    /// A detected text line in relative coordinates.
    pub fn text_line(bbox: [f32; 4], score: f32) -> Self {
        Self {
            bbox: Some(bbox),
            class_id: Some(1),
            class_name: Some(LayoutType::Word.into()),
            score: Some(score),
            absolute_coords: false,
            ..Default::default()
        }
    }

    /// The text read from the crop identified by `uuid`.
    pub fn recognized_text(uuid: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            text: Some(text.into()),
            score: Some(score),
            uuid: Some(uuid.into()),
            ..Default::default()
        }
    }

    /// A page rotation estimate.
    pub fn rotation(angle: f32) -> Self {
        Self {
            angle: Some(angle),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_from_json() {
        let cats = Categories::from_json(r#"{"1": "word"}"#).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats.get(1), Some(ObjectTypes::Layout(LayoutType::Word)));
        assert_eq!(cats, Categories::text_lines());
    }

    #[test]
    fn test_object_types_parse_and_display() {
        let angle: ObjectTypes = "Angle".parse().unwrap();
        assert_eq!(angle, ObjectTypes::Page(PageType::Angle));
        assert_eq!(angle.to_string(), "angle");
        assert!("table".parse::<ObjectTypes>().is_err());
    }

    #[test]
    fn test_text_line_serializes_box_key() {
        let result = DetectionResult::text_line([0.1, 0.2, 0.3, 0.4], 0.9);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["class_id"], 1);
        assert_eq!(json["class_name"], "word");
        assert_eq!(json["absolute_coords"], false);
        assert!(json.get("box").is_some());
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_recognized_text_shape() {
        let result = DetectionResult::recognized_text("ann-1", "hello", 0.75);
        assert_eq!(result.uuid.as_deref(), Some("ann-1"));
        assert_eq!(result.text.as_deref(), Some("hello"));
        assert!(result.bbox.is_none());
    }
}
