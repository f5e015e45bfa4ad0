use image::RgbImage;

use crate::{CollaboratorError, Region};

pub const DEFAULT_DETECTION_SIZE: u32 = 1024;
pub const DEFAULT_DETECTION_CONF: f32 = 0.25;

pub trait InstanceDetector: Send + Sync {
    /// Candidate regions in the frame of `image`. Finding nothing is `Ok(vec![])`.
    fn detect(&self, image: &RgbImage) -> Result<Vec<Region>, CollaboratorError>;
}
