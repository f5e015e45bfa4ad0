use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use thiserror::Error;

use crate::fish::{FishClass, PipelineResult, Trace};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("image encoding error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("json encoding error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Wire form of a pipeline result: counts plus the annotated frame as base64 PNG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub total_fish: usize,
    pub num_kilu: usize,
    pub num_raim: usize,
    pub image_base64: String,
}

impl CountReport {
    pub fn from_result(result: &PipelineResult) -> Result<CountReport, ReportError> {
        Ok(CountReport {
            total_fish: result.total_count,
            num_kilu: result.per_class_counts.get(FishClass::Kilu),
            num_raim: result.per_class_counts.get(FishClass::Raim),
            image_base64: encode_png_base64(&result.annotated_image)?,
        })
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstanceReport {
    pub label: FishClass,
    pub confidence: f32,
}

/// The raw per-instance view: one entry per confidently classified fish.
pub fn instance_reports(trace: &Trace) -> Vec<InstanceReport> {
    trace
        .classifications()
        .into_iter()
        .map(|classification| InstanceReport {
            label: classification.label,
            confidence: classification.confidence,
        })
        .collect()
}

pub fn encode_png_base64(image: &RgbImage) -> Result<String, ReportError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;

    Ok(STANDARD.encode(buffer.into_inner()))
}
