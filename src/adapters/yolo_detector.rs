use std::cmp::Ordering;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{ArrayView2, Axis, Ix3};
use tracing::debug;

use crate::adapters::onnx_model::{to_chw_tensor, OnnxModel};
use crate::adapters::InstanceDetector;
use crate::config::DetectorConfig;
use crate::{CollaboratorError, Region};

const PAD_VALUE: Rgb<u8> = Rgb([114, 114, 114]);

/// YOLO detection model exported to ONNX with a single `[1, 4 + classes, anchors]` output.
pub struct YoloDetector {
    model: OnnxModel,
    config: DetectorConfig,
}

impl YoloDetector {
    pub fn new(model_path: PathBuf, config: DetectorConfig) -> YoloDetector {
        YoloDetector {
            model: OnnxModel::new(model_path),
            config,
        }
    }

    pub fn load_model(&mut self) -> Result<(), CollaboratorError> {
        self.model.load_model()
    }
}

impl InstanceDetector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Region>, CollaboratorError> {
        let session = self.model.get_model()?;
        let (width, height) = image.dimensions();

        let letterbox = Letterbox::fit(width, height, self.config.input_size);
        let input = to_chw_tensor(&letterbox.apply(image));

        let input_name = self.model.input_name(0)?;
        let output_name = self.model.output_name(0)?;

        let outputs = session.run(ort::inputs![input_name => input.view()]?)?;
        let raw = outputs[output_name]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;
        let predictions = raw.index_axis(Axis(0), 0);

        let candidates = decode_candidates(predictions, self.config.conf_thresh);
        let kept = non_max_suppression(candidates, self.config.iou_thresh);
        debug!(kept = kept.len(), "detector candidates after nms");

        Ok(kept
            .iter()
            .map(|candidate| {
                let (x1, y1) = letterbox.unmap(candidate.x1, candidate.y1);
                let (x2, y2) = letterbox.unmap(candidate.x2, candidate.y2);
                Region::clipped(x1, y1, x2, y2, width, height)
            })
            .collect())
    }
}

/// Aspect-preserving resize into a centered square with gray padding.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    size: u32,
    scale: f32,
    resized: (u32, u32),
    pad: (u32, u32),
}

impl Letterbox {
    fn fit(width: u32, height: u32, size: u32) -> Letterbox {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let resized_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let resized_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        Letterbox {
            size,
            scale,
            resized: (resized_width, resized_height),
            pad: ((size - resized_width) / 2, (size - resized_height) / 2),
        }
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let resized = imageops::resize(image, self.resized.0, self.resized.1, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.size, self.size, PAD_VALUE);
        imageops::overlay(&mut canvas, &resized, self.pad.0 as i64, self.pad.1 as i64);

        canvas
    }

    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad.0 as f32) / self.scale,
            (y - self.pad.1 as f32) / self.scale,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let width = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let height = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Rows are `cx, cy, w, h, score_0, score_1, ...`; columns are anchors.
fn decode_candidates(predictions: ArrayView2<f32>, conf_thresh: f32) -> Vec<Candidate> {
    if predictions.nrows() <= 4 {
        return Vec::new();
    }

    predictions
        .axis_iter(Axis(1))
        .filter_map(|anchor| {
            let score = anchor
                .iter()
                .skip(4)
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if score < conf_thresh {
                return None;
            }

            let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
            Some(Candidate {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                score,
            })
        })
        .collect()
}

fn non_max_suppression(mut candidates: Vec<Candidate>, iou_thresh: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|existing| existing.iou(&candidate) <= iou_thresh) {
            kept.push(candidate);
        }
    }

    kept
}
