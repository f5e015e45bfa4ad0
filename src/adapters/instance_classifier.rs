use image::RgbImage;
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use tracing::debug;

use crate::fish::{Classification, FishClass};
use crate::CollaboratorError;

pub const DEFAULT_CONF_THRESH: f32 = 0.25;

pub trait InstanceClassifier: Send + Sync {
    /// `None` when the instance cannot be labelled with at least `conf_thresh` confidence.
    fn classify(
        &self,
        crop: &RgbImage,
        conf_thresh: f32,
    ) -> Result<Option<Classification>, CollaboratorError>;
}

/// A model producing one probability per class index.
pub trait ClassProbabilities: Send + Sync {
    /// `None` when the model gave no distribution for this input.
    fn probabilities(&self, crop: &RgbImage) -> Result<Option<Array1<f32>>, CollaboratorError>;
}

/// Top-1 classification over a probability model, gated on confidence.
pub struct GatedClassifier<M> {
    model: M,
}

impl<M: ClassProbabilities> GatedClassifier<M> {
    pub fn new(model: M) -> GatedClassifier<M> {
        GatedClassifier { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: ClassProbabilities> InstanceClassifier for GatedClassifier<M> {
    fn classify(
        &self,
        crop: &RgbImage,
        conf_thresh: f32,
    ) -> Result<Option<Classification>, CollaboratorError> {
        match self.model.probabilities(crop)? {
            Some(probabilities) => Ok(top_one(&probabilities, conf_thresh)),
            None => {
                debug!("classifier returned no distribution");
                Ok(None)
            }
        }
    }
}

/// Confidence equal to `conf_thresh` passes; strictly below does not.
pub fn top_one(probabilities: &Array1<f32>, conf_thresh: f32) -> Option<Classification> {
    let class_id = match probabilities.argmax() {
        Ok(class_id) => class_id,
        Err(error) => {
            debug!(%error, "unusable class distribution");
            return None;
        }
    };

    let confidence = probabilities[class_id];
    if confidence < conf_thresh {
        debug!(class_id, confidence, conf_thresh, "below confidence threshold");
        return None;
    }

    match FishClass::from_class_id(class_id) {
        Some(label) => Some(Classification::new(label, confidence)),
        None => {
            debug!(class_id, "class id outside the label table");
            None
        }
    }
}
