//! Collaborator doubles for tests.

use std::thread;
use std::time::Duration;

use image::RgbImage;
use ndarray::Array1;
use parking_lot::Mutex;

use crate::adapters::{ClassProbabilities, InstanceDetector, InstanceSegmentor};
use crate::{CollaboratorError, Mask, Region};

pub struct FixedDetector {
    regions: Vec<Region>,
    delay: Option<Duration>,
    seen: Mutex<Vec<(u32, u32)>>,
}

impl FixedDetector {
    pub fn new(regions: Vec<Region>) -> FixedDetector {
        FixedDetector {
            regions,
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(regions: Vec<Region>, delay: Duration) -> FixedDetector {
        FixedDetector {
            delay: Some(delay),
            ..FixedDetector::new(regions)
        }
    }

    /// Dimensions of every frame passed to `detect`.
    pub fn seen(&self) -> Vec<(u32, u32)> {
        self.seen.lock().clone()
    }
}

impl InstanceDetector for FixedDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Region>, CollaboratorError> {
        self.seen.lock().push(image.dimensions());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        Ok(self.regions.clone())
    }
}

pub struct UnreachableDetector;

impl InstanceDetector for UnreachableDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Region>, CollaboratorError> {
        Err(CollaboratorError::Unavailable("connection refused".into()))
    }
}

/// Returns a preset mask per region; regions without one fail.
pub struct ScriptedSegmentor {
    masks: Vec<(Region, Mask)>,
    primed: Option<(u32, u32)>,
    pub prime_calls: usize,
}

impl ScriptedSegmentor {
    pub fn new(masks: Vec<(Region, Mask)>) -> ScriptedSegmentor {
        ScriptedSegmentor {
            masks,
            primed: None,
            prime_calls: 0,
        }
    }
}

impl InstanceSegmentor for ScriptedSegmentor {
    fn prime(&mut self, image: &RgbImage) -> Result<(), CollaboratorError> {
        self.primed = Some(image.dimensions());
        self.prime_calls += 1;
        Ok(())
    }

    fn segment(&self, region: &Region) -> Result<Mask, CollaboratorError> {
        if self.primed.is_none() {
            return Err(CollaboratorError::NotPrimed);
        }

        self.masks
            .iter()
            .find(|(candidate, _)| candidate == region)
            .map(|(_, mask)| mask.clone())
            .ok_or_else(|| CollaboratorError::Unavailable(format!("no mask for {:?}", region)))
    }
}

/// Boxes each region inside whatever frame it was last primed with.
pub struct BoxSegmentor {
    primed: Option<(u32, u32)>,
    delay: Duration,
    pub prime_calls: usize,
}

impl BoxSegmentor {
    pub fn new(delay: Duration) -> BoxSegmentor {
        BoxSegmentor {
            primed: None,
            delay,
            prime_calls: 0,
        }
    }
}

impl InstanceSegmentor for BoxSegmentor {
    fn prime(&mut self, image: &RgbImage) -> Result<(), CollaboratorError> {
        thread::sleep(self.delay);
        self.primed = Some(image.dimensions());
        self.prime_calls += 1;
        Ok(())
    }

    fn segment(&self, region: &Region) -> Result<Mask, CollaboratorError> {
        let (width, height) = self.primed.ok_or(CollaboratorError::NotPrimed)?;
        thread::sleep(self.delay);
        Ok(Mask::from_region(region, width as usize, height as usize))
    }
}

/// Answers by crop width; unknown widths get no distribution.
pub struct ScriptedProbabilities {
    by_width: Vec<(u32, Array1<f32>)>,
}

impl ScriptedProbabilities {
    pub fn new(by_width: Vec<(u32, Array1<f32>)>) -> ScriptedProbabilities {
        ScriptedProbabilities { by_width }
    }
}

impl ClassProbabilities for ScriptedProbabilities {
    fn probabilities(&self, crop: &RgbImage) -> Result<Option<Array1<f32>>, CollaboratorError> {
        Ok(self
            .by_width
            .iter()
            .find(|(width, _)| *width == crop.width())
            .map(|(_, probabilities)| probabilities.clone()))
    }
}
