use image::RgbImage;

use crate::{CollaboratorError, Mask, Region};

/// Segmentation against one primed image at a time.
///
/// `prime` pays the per-image cost once; `segment` may then be called any number of
/// times, and concurrently, for regions of that image. Priming again replaces the image.
pub trait InstanceSegmentor: Send + Sync {
    fn prime(&mut self, image: &RgbImage) -> Result<(), CollaboratorError>;

    /// Exactly one mask, prompted by the region's center point and the region as a box.
    fn segment(&self, region: &Region) -> Result<Mask, CollaboratorError>;
}
