use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::Array4;
use ort::{GraphOptimizationLevel, Session};
use tracing::info;

use crate::CollaboratorError;

/// An ONNX Runtime session loaded lazily from a file.
pub struct OnnxModel {
    model_path: PathBuf,
    model: Option<Session>,
}

impl OnnxModel {
    pub fn new(model_path: PathBuf) -> OnnxModel {
        OnnxModel {
            model_path,
            model: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.model_path
    }

    fn create_model(&self) -> Result<Session, CollaboratorError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&self.model_path)?;
        info!(
            path = %self.model_path.display(),
            inputs = session.inputs.len(),
            outputs = session.outputs.len(),
            "loaded onnx model"
        );

        Ok(session)
    }

    /// Loads the session on first call; later calls are no-ops.
    pub fn load_model(&mut self) -> Result<(), CollaboratorError> {
        if self.model.is_none() {
            self.model = Some(self.create_model()?);
        }

        Ok(())
    }

    pub fn get_model(&self) -> Result<&Session, CollaboratorError> {
        self.model.as_ref().ok_or(CollaboratorError::ModelLoadError)
    }

    pub fn input_name(&self, index: usize) -> Result<&str, CollaboratorError> {
        match self.get_model()?.inputs.get(index) {
            Some(input) => Ok(input.name.as_str()),
            None => Err(CollaboratorError::OutputError(format!(
                "{} has no input #{}",
                self.model_path.display(),
                index
            ))),
        }
    }

    pub fn output_name(&self, index: usize) -> Result<&str, CollaboratorError> {
        match self.get_model()?.outputs.get(index) {
            Some(output) => Ok(output.name.as_str()),
            None => Err(CollaboratorError::OutputError(format!(
                "{} has no output #{}",
                self.model_path.display(),
                index
            ))),
        }
    }
}

/// `[1, 3, H, W]` tensor with RGB values scaled to `[0, 1]`.
pub fn to_chw_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn chw_layout_keeps_rgb_order() {
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(2, 1, Rgb([255, 0, 51]));

        let tensor = to_chw_tensor(&image);

        assert_eq!(tensor.shape(), &[1, 3, 2, 3]);
        assert_eq!(tensor[[0, 0, 1, 2]], 1.0);
        assert_eq!(tensor[[0, 1, 1, 2]], 0.0);
        assert_eq!(tensor[[0, 2, 1, 2]], 0.2);
    }

    #[test]
    fn unloaded_model_is_unavailable() {
        let model = OnnxModel::new(PathBuf::from("missing.onnx"));

        assert!(matches!(model.get_model(), Err(CollaboratorError::ModelLoadError)));
        assert!(matches!(model.input_name(0), Err(CollaboratorError::ModelLoadError)));
    }

    #[test]
    fn failed_load_leaves_model_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = OnnxModel::new(dir.path().join("missing.onnx"));

        assert!(model.load_model().is_err());
        assert!(matches!(model.get_model(), Err(CollaboratorError::ModelLoadError)));
    }
}
