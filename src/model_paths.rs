use std::path::{Path, PathBuf};

use app_dirs2::{get_app_root, AppDataType, AppInfo};
use thiserror::Error;
use tracing::debug;

use crate::config::ModelConfig;

const APP_INFO: AppInfo = AppInfo {
    name: "fishcount",
    author: "fishcount",
};

#[derive(Debug, Error)]
pub enum ModelPathError {
    #[error("could not locate the user cache directory: {0}")]
    AppDirsError(#[from] app_dirs2::AppDirsError),
    #[error("model file not found: {}", .0.display())]
    MissingModel(PathBuf),
}

/// On-disk locations of the four model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub segmentor_encoder: PathBuf,
    pub segmentor_decoder: PathBuf,
    pub classifier: PathBuf,
}

impl ModelPaths {
    /// `<user cache>/fishcount/models`.
    pub fn default_model_dir() -> Result<PathBuf, ModelPathError> {
        let mut path = get_app_root(AppDataType::UserCache, &APP_INFO)?;
        path.push("models");

        Ok(path)
    }

    pub fn resolve(config: &ModelConfig) -> Result<ModelPaths, ModelPathError> {
        let model_dir = match &config.model_dir {
            Some(dir) => dir.clone(),
            None => ModelPaths::default_model_dir()?,
        };
        debug!(model_dir = %model_dir.display(), "resolving model files");

        Ok(ModelPaths::in_dir(&model_dir, config))
    }

    pub fn in_dir(model_dir: &Path, config: &ModelConfig) -> ModelPaths {
        ModelPaths {
            detector: model_dir.join(&config.detector),
            segmentor_encoder: model_dir.join(&config.segmentor_encoder),
            segmentor_decoder: model_dir.join(&config.segmentor_decoder),
            classifier: model_dir.join(&config.classifier),
        }
    }

    /// Fails on the first model file that does not exist.
    pub fn verify(&self) -> Result<(), ModelPathError> {
        for path in [
            &self.detector,
            &self.segmentor_encoder,
            &self.segmentor_decoder,
            &self.classifier,
        ] {
            if !path.is_file() {
                return Err(ModelPathError::MissingModel(path.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let config = ModelConfig {
            model_dir: Some(PathBuf::from("/opt/models")),
            ..ModelConfig::default()
        };

        let paths = ModelPaths::resolve(&config).unwrap();

        assert_eq!(paths.detector, PathBuf::from("/opt/models/detector.onnx"));
        assert_eq!(paths.segmentor_encoder, PathBuf::from("/opt/models/sam_encoder.onnx"));
        assert_eq!(paths.segmentor_decoder, PathBuf::from("/opt/models/sam_decoder.onnx"));
        assert_eq!(paths.classifier, PathBuf::from("/opt/models/classifier.onnx"));
    }

    #[test]
    fn verify_reports_the_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::default();
        let paths = ModelPaths::in_dir(dir.path(), &config);

        for present in [&paths.detector, &paths.segmentor_encoder, &paths.segmentor_decoder] {
            File::create(present).unwrap();
        }

        match paths.verify() {
            Err(ModelPathError::MissingModel(path)) => assert_eq!(path, paths.classifier),
            other => panic!("expected a missing classifier, got {:?}", other),
        }

        File::create(&paths.classifier).unwrap();
        assert!(paths.verify().is_ok());
    }
}
