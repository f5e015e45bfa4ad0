use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::{DEFAULT_CONF_THRESH, DEFAULT_DETECTION_CONF, DEFAULT_DETECTION_SIZE};
use crate::fish::DEFAULT_MIN_AREA;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    IOError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_area: usize,
    pub conf_thresh: f32,
    /// Upper bound on any single collaborator call. Unset means unbounded.
    pub collaborator_timeout_secs: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            min_area: DEFAULT_MIN_AREA,
            conf_thresh: DEFAULT_CONF_THRESH,
            collaborator_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn collaborator_timeout(&self) -> Option<Duration> {
        self.collaborator_timeout_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Long edge of the square inference input.
    pub input_size: u32,
    pub conf_thresh: f32,
    pub iou_thresh: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            input_size: DEFAULT_DETECTION_SIZE,
            conf_thresh: DEFAULT_DETECTION_CONF,
            iou_thresh: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentorConfig {
    pub input_size: u32,
    pub mask_threshold: f32,
}

impl Default for SegmentorConfig {
    fn default() -> Self {
        SegmentorConfig {
            input_size: 1024,
            mask_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub input_size: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig { input_size: 640 }
    }
}

/// Model file names, relative to `model_dir` (or the user cache directory when unset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_dir: Option<PathBuf>,
    pub detector: String,
    pub segmentor_encoder: String,
    pub segmentor_decoder: String,
    pub classifier: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            model_dir: None,
            detector: "detector.onnx".into(),
            segmentor_encoder: "sam_encoder.onnx".into(),
            segmentor_decoder: "sam_decoder.onnx".into(),
            classifier: "classifier.onnx".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub detector: DetectorConfig,
    pub segmentor: SegmentorConfig,
    pub classifier: ClassifierConfig,
    pub models: ModelConfig,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        Settings::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Settings, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `FISHCOUNT_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Rejects values the model adapters cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, size) in [
            ("detector.input_size", self.detector.input_size),
            ("segmentor.input_size", self.segmentor.input_size),
            ("classifier.input_size", self.classifier.input_size),
        ] {
            if size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: size.to_string(),
                });
            }
        }

        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FISHCOUNT_MIN_AREA") {
            self.pipeline.min_area = parse("FISHCOUNT_MIN_AREA", &value)?;
        }
        if let Some(value) = lookup("FISHCOUNT_CONF_THRESH") {
            self.pipeline.conf_thresh = parse("FISHCOUNT_CONF_THRESH", &value)?;
        }
        if let Some(value) = lookup("FISHCOUNT_TIMEOUT_SECS") {
            self.pipeline.collaborator_timeout_secs = Some(parse("FISHCOUNT_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("FISHCOUNT_MODEL_DIR") {
            self.models.model_dir = Some(PathBuf::from(value));
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();

        assert_eq!(settings.pipeline.min_area, 10_000);
        assert_eq!(settings.pipeline.conf_thresh, 0.25);
        assert_eq!(settings.pipeline.collaborator_timeout(), None);
        assert_eq!(settings.detector.input_size, 1024);
        assert_eq!(settings.detector.conf_thresh, 0.25);
        assert_eq!(settings.classifier.input_size, 640);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [pipeline]
            conf_thresh = 0.5
            collaborator_timeout_secs = 2.5

            [models]
            model_dir = "/opt/fishcount"
            "#,
        )
        .unwrap();

        assert_eq!(settings.pipeline.conf_thresh, 0.5);
        assert_eq!(settings.pipeline.min_area, 10_000);
        assert_eq!(settings.pipeline.collaborator_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(settings.models.model_dir, Some(PathBuf::from("/opt/fishcount")));
        assert_eq!(settings.models.detector, "detector.onnx");
        assert_eq!(settings.segmentor, SegmentorConfig::default());
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detector]\ninput_size = 640").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();

        assert_eq!(settings.detector.input_size, 640);
        assert!(matches!(
            Settings::from_toml_str("[pipeline]\nmin_area = \"lots\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn zero_input_sizes_are_rejected() {
        assert!(Settings::default().validate().is_ok());

        for (toml, key) in [
            ("[detector]\ninput_size = 0", "detector.input_size"),
            ("[segmentor]\ninput_size = 0", "segmentor.input_size"),
            ("[classifier]\ninput_size = 0", "classifier.input_size"),
        ] {
            let settings = Settings::from_toml_str(toml).unwrap();

            match settings.validate() {
                Err(ConfigError::InvalidValue { key: rejected, value }) => {
                    assert_eq!(rejected, key);
                    assert_eq!(value, "0");
                }
                other => panic!("expected {} to be rejected, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FISHCOUNT_MIN_AREA", "5000"),
            ("FISHCOUNT_TIMEOUT_SECS", "0"),
            ("FISHCOUNT_MODEL_DIR", "/models"),
        ]);
        let mut settings = Settings::default();

        settings
            .apply_overrides(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(settings.pipeline.min_area, 5000);
        assert_eq!(settings.pipeline.conf_thresh, 0.25);
        // zero disables the bound
        assert_eq!(settings.pipeline.collaborator_timeout(), None);
        assert_eq!(settings.models.model_dir, Some(PathBuf::from("/models")));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut settings = Settings::default();

        let result = settings.apply_overrides(|key| {
            (key == "FISHCOUNT_CONF_THRESH").then(|| "high".to_string())
        });

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
