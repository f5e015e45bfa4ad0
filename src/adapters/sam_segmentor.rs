use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{array, s, Array1, Array2, Array3, Array4, ArrayD, ArrayView2, Ix4};
use tracing::debug;

use crate::adapters::onnx_model::OnnxModel;
use crate::adapters::InstanceSegmentor;
use crate::config::SegmentorConfig;
use crate::{CollaboratorError, Mask, Region};

const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];
const LOW_RES_MASK_SIZE: usize = 256;

// point labels understood by the prompt decoder
const FOREGROUND_POINT: f32 = 1.0;
const BOX_TOP_LEFT: f32 = 2.0;
const BOX_BOTTOM_RIGHT: f32 = 3.0;

struct PrimedImage {
    embedding: ArrayD<f32>,
    scale: f32,
    width: u32,
    height: u32,
}

/// Segment Anything split into an image encoder (run once per image) and a prompt decoder.
pub struct SamSegmentor {
    encoder: OnnxModel,
    decoder: OnnxModel,
    config: SegmentorConfig,
    primed: Option<PrimedImage>,
}

impl SamSegmentor {
    pub fn new(encoder_path: PathBuf, decoder_path: PathBuf, config: SegmentorConfig) -> SamSegmentor {
        SamSegmentor {
            encoder: OnnxModel::new(encoder_path),
            decoder: OnnxModel::new(decoder_path),
            config,
            primed: None,
        }
    }

    pub fn load_model(&mut self) -> Result<(), CollaboratorError> {
        self.encoder.load_model()?;
        self.decoder.load_model()
    }
}

impl InstanceSegmentor for SamSegmentor {
    fn prime(&mut self, image: &RgbImage) -> Result<(), CollaboratorError> {
        // drop the previous image first so a failed prime never leaves it in place
        self.primed = None;

        let session = self.encoder.get_model()?;
        let input_name = self.encoder.input_name(0)?;
        let output_name = self.encoder.output_name(0)?;

        let (input, scale) = encoder_input(image, self.config.input_size);
        let outputs = session.run(ort::inputs![input_name => input.view()]?)?;
        let embedding = outputs[output_name].try_extract_tensor::<f32>()?.into_owned();
        debug!(shape = ?embedding.shape(), "primed segmentor");

        self.primed = Some(PrimedImage {
            embedding,
            scale,
            width: image.width(),
            height: image.height(),
        });

        Ok(())
    }

    fn segment(&self, region: &Region) -> Result<Mask, CollaboratorError> {
        let primed = self.primed.as_ref().ok_or(CollaboratorError::NotPrimed)?;
        let session = self.decoder.get_model()?;
        let output_name = self.decoder.output_name(0)?;

        let (point_coords, point_labels) = prompt(region, primed.scale);
        let mask_input = Array4::<f32>::zeros((1, 1, LOW_RES_MASK_SIZE, LOW_RES_MASK_SIZE));
        let has_mask_input = array![0.0f32];
        let orig_im_size: Array1<f32> = array![primed.height as f32, primed.width as f32];

        let outputs = session.run(ort::inputs![
            "image_embeddings" => primed.embedding.view(),
            "point_coords" => point_coords.view(),
            "point_labels" => point_labels.view(),
            "mask_input" => mask_input.view(),
            "has_mask_input" => has_mask_input.view(),
            "orig_im_size" => orig_im_size.view()
        ]?)?;

        let logits = outputs[output_name]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix4>()?;
        let (_, masks, height, width) = logits.dim();
        if masks == 0 || height != primed.height as usize || width != primed.width as usize {
            return Err(CollaboratorError::OutputError(format!(
                "decoder returned masks of shape {:?} for a {}x{} image",
                logits.shape(),
                primed.width,
                primed.height
            )));
        }

        // single-mask mode: the first proposal is the answer
        Ok(mask_from_logits(logits.slice(s![0, 0, .., ..]), self.config.mask_threshold))
    }
}

/// Long side resized to `size`, normalized, zero-padded bottom-right to `size` x `size`.
fn encoder_input(image: &RgbImage, size: u32) -> (Array4<f32>, f32) {
    let (width, height) = image.dimensions();
    let scale = size as f32 / width.max(height) as f32;
    let resized_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let resized_height = ((height as f32 * scale).round() as u32).clamp(1, size);

    let resized = imageops::resize(image, resized_width, resized_height, FilterType::Triangle);
    let mut tensor = Array4::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] =
                (pixel[channel] as f32 - PIXEL_MEAN[channel]) / PIXEL_STD[channel];
        }
    }

    (tensor, scale)
}

/// Center point plus box corners, in encoder coordinates.
fn prompt(region: &Region, scale: f32) -> (Array3<f32>, Array2<f32>) {
    let (cx, cy) = region.center();
    let points = [
        (cx, cy),
        (region.x1, region.y1),
        (region.x2, region.y2),
    ];

    let coords = Array3::from_shape_fn((1, points.len(), 2), |(_, point, axis)| {
        let (x, y) = points[point];
        let value = if axis == 0 { x } else { y };
        value as f32 * scale
    });
    let labels = array![[FOREGROUND_POINT, BOX_TOP_LEFT, BOX_BOTTOM_RIGHT]];

    (coords, labels)
}

fn mask_from_logits(logits: ArrayView2<f32>, threshold: f32) -> Mask {
    Mask::new(logits.mapv(|logit| logit > threshold))
}
