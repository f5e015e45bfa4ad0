mod instance_classifier;
mod instance_detector;
mod instance_segmentor;

#[cfg(feature = "onnx")]
mod onnx_model;
#[cfg(feature = "onnx")]
mod sam_segmentor;
#[cfg(feature = "onnx")]
mod yolo_classifier;
#[cfg(feature = "onnx")]
mod yolo_detector;

#[cfg(test)]
pub(crate) mod fakes;

pub use instance_classifier::{
    top_one, ClassProbabilities, GatedClassifier, InstanceClassifier, DEFAULT_CONF_THRESH,
};
pub use instance_detector::{InstanceDetector, DEFAULT_DETECTION_CONF, DEFAULT_DETECTION_SIZE};
pub use instance_segmentor::InstanceSegmentor;

#[cfg(feature = "onnx")]
pub use onnx_model::OnnxModel;
#[cfg(feature = "onnx")]
pub use sam_segmentor::SamSegmentor;
#[cfg(feature = "onnx")]
pub use yolo_classifier::{FishClassifier, YoloClassifier};
#[cfg(feature = "onnx")]
pub use yolo_detector::YoloDetector;
