use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array1, Axis, Ix2};

use crate::adapters::onnx_model::{to_chw_tensor, OnnxModel};
use crate::adapters::{ClassProbabilities, GatedClassifier};
use crate::config::ClassifierConfig;
use crate::CollaboratorError;

/// YOLO classification model exported to ONNX with a `[1, classes]` probability output.
pub struct YoloClassifier {
    model: OnnxModel,
    config: ClassifierConfig,
}

pub type FishClassifier = GatedClassifier<YoloClassifier>;

impl YoloClassifier {
    pub fn new(model_path: PathBuf, config: ClassifierConfig) -> YoloClassifier {
        YoloClassifier {
            model: OnnxModel::new(model_path),
            config,
        }
    }

    pub fn load_model(&mut self) -> Result<(), CollaboratorError> {
        self.model.load_model()
    }
}

impl ClassProbabilities for YoloClassifier {
    fn probabilities(&self, crop: &RgbImage) -> Result<Option<Array1<f32>>, CollaboratorError> {
        let session = self.model.get_model()?;
        let input_name = self.model.input_name(0)?;
        let output_name = self.model.output_name(0)?;

        let input = to_chw_tensor(&center_square(crop, self.config.input_size));
        let outputs = session.run(ort::inputs![input_name => input.view()]?)?;
        let scores = outputs[output_name]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix2>()?;

        match scores.axis_iter(Axis(0)).next() {
            Some(row) if !row.is_empty() => Ok(Some(row.to_owned())),
            _ => Ok(None),
        }
    }
}

/// Short side resized to `size`, then the central `size` x `size` window.
fn center_square(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale = size as f32 / width.min(height) as f32;
    let resized_width = ((width as f32 * scale).round() as u32).max(size);
    let resized_height = ((height as f32 * scale).round() as u32).max(size);

    let resized = imageops::resize(image, resized_width, resized_height, FilterType::Triangle);
    let left = (resized_width - size) / 2;
    let top = (resized_height - size) / 2;

    imageops::crop_imm(&resized, left, top, size, size).to_image()
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn center_square_keeps_the_middle() {
        // left third red, middle blue, right third red
        let image = RgbImage::from_fn(300, 100, |x, _| {
            if (100..200).contains(&x) {
                Rgb([0, 0, 255])
            } else {
                Rgb([255, 0, 0])
            }
        });

        let square = center_square(&image, 50);

        assert_eq!(square.dimensions(), (50, 50));
        assert_eq!(square.get_pixel(25, 25), &Rgb([0, 0, 255]));
    }

    #[test]
    fn tiny_crops_are_upscaled() {
        let square = center_square(&RgbImage::new(3, 7), 16);

        assert_eq!(square.dimensions(), (16, 16));
    }

    #[test]
    fn unloaded_classifier_is_unavailable() {
        let classifier = YoloClassifier::new(PathBuf::from("classifier.onnx"), ClassifierConfig::default());

        assert!(matches!(
            classifier.probabilities(&RgbImage::new(4, 4)),
            Err(CollaboratorError::ModelLoadError)
        ));
    }
}
