//! docTR OCR Example
//!
//! Deskews each page, detects its text lines, reads them and prints the
//! results as JSON, one document per image.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example doctr_ocr -- [OPTIONS] --det-weights <PATH> --rec-weights <PATH> <IMAGES>...
//! ```
//!
//! # Example
//!
//! ```bash
//! cargo run --example doctr_ocr -- \
//!     --det-weights models/db_resnet50.onnx \
//!     --rec-weights models/crnn_vgg16_bn.onnx \
//!     page1.png page2.png
//! ```

use clap::Parser;
use oar_doctr::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// Command-line arguments for the docTR OCR example
#[derive(Parser)]
#[command(name = "doctr_ocr")]
#[command(about = "docTR OCR Example - deskew, detect and recognize text")]
struct Args {
    /// Paths to input page images
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Detection architecture
    #[arg(long, default_value = "db_resnet50")]
    det_arch: String,

    /// Detection weights (.onnx, .zip, .safetensors, .pt)
    #[arg(long)]
    det_weights: PathBuf,

    /// Recognition architecture
    #[arg(long, default_value = "crnn_vgg16_bn")]
    rec_arch: String,

    /// Recognition weights (.onnx, .zip, .safetensors, .pt)
    #[arg(long)]
    rec_weights: PathBuf,

    /// Recognition config file for custom vocabularies
    #[arg(long)]
    rec_config: Option<PathBuf>,

    /// Backend ('onnx' or 'candle'); picked automatically when omitted
    #[arg(long)]
    backend: Option<Backend>,

    /// Device ('cpu', 'cuda', 'cuda:N'); picked automatically when omitted
    #[arg(long)]
    device: Option<Device>,

    /// Skip page deskewing
    #[arg(long)]
    no_deskew: bool,
}

#[derive(Serialize)]
struct PageOutput {
    image: String,
    angle: Option<f32>,
    lines: Vec<LineOutput>,
}

#[derive(Serialize)]
struct LineOutput {
    #[serde(rename = "box")]
    bbox: [f32; 4],
    detection_score: f32,
    text: String,
    confidence: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    oar_doctr::core::init_tracing();
    let args = Args::parse();

    let deskew = DocTrRotationTransformer::default();
    let detector = DoctrTextlineDetector::new(
        &args.det_arch,
        &args.det_weights,
        Categories::text_lines(),
        args.device,
        args.backend,
    )?;
    let recognizer = DoctrTextRecognizer::new(
        &args.rec_arch,
        &args.rec_weights,
        args.device,
        args.backend,
        args.rec_config.clone(),
    )?;
    info!("detector: {} ({})", detector.name(), detector.model_id());
    info!("recognizer: {} ({})", recognizer.name(), recognizer.model_id());

    let mut pages = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let start = Instant::now();
        let mut page = match load_image(path) {
            Ok(page) => page,
            Err(e) => {
                error!("skipping {}: {e}", path.display());
                continue;
            }
        };

        let mut angle = None;
        if !args.no_deskew {
            let rotation = deskew.predict(&page)?;
            angle = rotation.angle;
            page = deskew.transform(&page, &rotation)?;
        }

        let detections = detector.predict(&page)?;
        let mut boxes = Vec::with_capacity(detections.len());
        let mut crops = Vec::with_capacity(detections.len());
        for (i, detection) in detections.iter().enumerate() {
            let (Some(bbox), Some(score)) = (detection.bbox, detection.score) else {
                continue;
            };
            if let Some(crop) = crop_relative(&page, &bbox) {
                boxes.push((bbox, score));
                crops.push((i.to_string(), crop));
            }
        }

        let readings = recognizer.predict(&crops)?;
        let lines = boxes
            .into_iter()
            .zip(readings)
            .map(|((bbox, detection_score), reading)| LineOutput {
                bbox,
                detection_score,
                text: reading.text.unwrap_or_default(),
                confidence: reading.score.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        info!(
            "{}: {} line(s) in {:.2?}",
            path.display(),
            lines.len(),
            start.elapsed()
        );
        pages.push(PageOutput {
            image: path.display().to_string(),
            angle,
            lines,
        });
    }

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}
