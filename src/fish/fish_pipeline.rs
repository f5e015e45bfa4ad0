use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::adapters::{InstanceClassifier, InstanceDetector, InstanceSegmentor};
use crate::bounded::run_bounded;
use crate::fish::{
    aggregate, render_outlines, try_extract_crop, ClassCounts, Classification, CropRejection,
    FishClass, Palette,
};
use crate::orientation::normalize_orientation;
use crate::{CollaboratorError, Mask, PipelineError, Region, Stage};

/// An instance that survived the area gate.
#[derive(Debug, Clone)]
pub struct TracedInstance {
    pub region: Region,
    pub mask: Mask,
    /// `None` when the classifier was not confident enough.
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rejections {
    pub shape_mismatch: usize,
    pub empty_mask: usize,
    pub below_min_area: usize,
    pub low_confidence: usize,
}

impl Rejections {
    fn record(&mut self, rejection: CropRejection) {
        match rejection {
            CropRejection::ShapeMismatch => self.shape_mismatch += 1,
            CropRejection::EmptyMask => self.empty_mask += 1,
            CropRejection::BelowMinArea { .. } => self.below_min_area += 1,
        }
    }
}

/// Everything one invocation extracted and classified, in the normalized frame.
#[derive(Debug, Clone)]
pub struct Trace {
    frame: Arc<RgbImage>,
    regions_detected: usize,
    instances: Vec<TracedInstance>,
    rejections: Rejections,
}

impl Trace {
    fn new(frame: Arc<RgbImage>, regions_detected: usize) -> Trace {
        Trace {
            frame,
            regions_detected,
            instances: Vec::new(),
            rejections: Rejections::default(),
        }
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn regions_detected(&self) -> usize {
        self.regions_detected
    }

    pub fn instances(&self) -> &[TracedInstance] {
        &self.instances
    }

    pub fn rejections(&self) -> Rejections {
        self.rejections
    }

    /// Per-instance labels, without aggregation or drawing.
    pub fn classifications(&self) -> Vec<Classification> {
        self.instances
            .iter()
            .filter_map(|instance| instance.classification)
            .collect()
    }

    /// Counts plus the annotated frame.
    pub fn to_result(&self, palette: &Palette) -> PipelineResult {
        let tally = aggregate(
            self.instances
                .iter()
                .map(|instance| (&instance.mask, instance.classification.as_ref())),
        );

        let outlines: Vec<(&Mask, Option<FishClass>)> = tally
            .accepted
            .iter()
            .map(|(mask, label)| (*mask, Some(*label)))
            .collect();

        PipelineResult {
            total_count: tally.total_count,
            per_class_counts: tally.per_class_counts,
            annotated_image: render_outlines(&self.frame, &outlines, palette),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub total_count: usize,
    pub per_class_counts: ClassCounts,
    pub annotated_image: RgbImage,
}

/// Detect, segment, crop, classify, count and draw.
///
/// Collaborators are injected and shared across calls. The segmentor holds per-image state,
/// so invocations take turns on it for the whole of their region loop.
pub struct FishPipeline<D, S, C> {
    detector: Arc<D>,
    segmentor: Arc<RwLock<S>>,
    segmentor_turn: Mutex<()>,
    /// Ticket of the most recent prime request.
    latest_prime: Arc<AtomicU64>,
    classifier: Arc<C>,
    timeout: Option<Duration>,
    palette: Palette,
}

impl<D, S, C> FishPipeline<D, S, C>
where
    D: InstanceDetector + 'static,
    S: InstanceSegmentor + 'static,
    C: InstanceClassifier + 'static,
{
    pub fn new(detector: D, segmentor: S, classifier: C) -> FishPipeline<D, S, C> {
        FishPipeline {
            detector: Arc::new(detector),
            segmentor: Arc::new(RwLock::new(segmentor)),
            segmentor_turn: Mutex::new(()),
            latest_prime: Arc::new(AtomicU64::new(0)),
            classifier: Arc::new(classifier),
            timeout: None,
            palette: Palette::default(),
        }
    }

    /// Bounds every collaborator call; `None` runs them inline and unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> FishPipeline<D, S, C> {
        self.timeout = timeout;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> FishPipeline<D, S, C> {
        self.palette = palette;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn process(
        &self,
        image: &RgbImage,
        min_area: usize,
        conf_thresh: f32,
    ) -> Result<PipelineResult, PipelineError> {
        let trace = self.trace(image, min_area, conf_thresh)?;
        Ok(trace.to_result(&self.palette))
    }

    pub fn trace(
        &self,
        image: &RgbImage,
        min_area: usize,
        conf_thresh: f32,
    ) -> Result<Trace, PipelineError> {
        validate(image, conf_thresh)?;

        let span = info_span!("fish_pipeline", width = image.width(), height = image.height());
        let _enter = span.enter();

        let frame = Arc::new(normalize_orientation(image));
        let regions = self.detect(&frame)?;
        let mut trace = Trace::new(Arc::clone(&frame), regions.len());

        if regions.is_empty() {
            info!("no regions detected");
            return Ok(trace);
        }

        let _turn = self.segmentor_turn.lock();
        self.prime(&frame)?;

        for (index, region) in regions.into_iter().enumerate() {
            let mask = self.segment(region)?;

            let crop = match try_extract_crop(&frame, &mask, min_area) {
                Ok(crop) => crop,
                Err(rejection) => {
                    match rejection {
                        CropRejection::ShapeMismatch => warn!(
                            index,
                            mask_width = mask.width(),
                            mask_height = mask.height(),
                            "discarding region with a mask from another frame"
                        ),
                        _ => debug!(index, ?rejection, "region rejected"),
                    }
                    trace.rejections.record(rejection);
                    continue;
                }
            };

            let classification = self.classify(crop, conf_thresh)?;
            match classification {
                Some(classification) => debug!(
                    index,
                    label = %classification.label,
                    confidence = classification.confidence,
                    "region classified"
                ),
                None => {
                    debug!(index, "region below confidence threshold");
                    trace.rejections.low_confidence += 1;
                }
            }

            trace.instances.push(TracedInstance {
                region,
                mask,
                classification,
            });
        }

        info!(
            regions = trace.regions_detected,
            classified = trace.classifications().len(),
            rejections = ?trace.rejections,
            "pipeline finished"
        );

        Ok(trace)
    }

    fn detect(&self, frame: &Arc<RgbImage>) -> Result<Vec<Region>, PipelineError> {
        let detector = Arc::clone(&self.detector);
        let frame = Arc::clone(frame);

        run_bounded(self.timeout, move || detector.detect(&frame))
            .map_err(PipelineError::collaborator(Stage::Detection))
    }

    fn prime(&self, frame: &Arc<RgbImage>) -> Result<(), PipelineError> {
        let segmentor = Arc::clone(&self.segmentor);
        let latest = Arc::clone(&self.latest_prime);
        let frame = Arc::clone(frame);
        let ticket = self.latest_prime.fetch_add(1, Ordering::SeqCst) + 1;

        run_bounded(self.timeout, move || prime_if_current(&segmentor, &latest, ticket, &frame))
            .map_err(PipelineError::collaborator(Stage::Segmentation))
    }

    fn segment(&self, region: Region) -> Result<Mask, PipelineError> {
        let segmentor = Arc::clone(&self.segmentor);

        run_bounded(self.timeout, move || segmentor.read().segment(&region))
            .map_err(PipelineError::collaborator(Stage::Segmentation))
    }

    fn classify(
        &self,
        crop: RgbImage,
        conf_thresh: f32,
    ) -> Result<Option<Classification>, PipelineError> {
        let classifier = Arc::clone(&self.classifier);

        run_bounded(self.timeout, move || classifier.classify(&crop, conf_thresh))
            .map_err(PipelineError::collaborator(Stage::Classification))
    }
}

/// Primes unless a later request has been issued since `ticket`.
///
/// A worker abandoned after a timeout may still be queued on the write lock; once it gets
/// the lock it must not replace the image of the invocation that came after it.
fn prime_if_current<S: InstanceSegmentor>(
    segmentor: &RwLock<S>,
    latest: &AtomicU64,
    ticket: u64,
    frame: &RgbImage,
) -> Result<(), CollaboratorError> {
    let mut segmentor = segmentor.write();
    if latest.load(Ordering::SeqCst) != ticket {
        debug!(ticket, "skipping superseded prime");
        return Ok(());
    }

    segmentor.prime(frame)
}

fn validate(image: &RgbImage, conf_thresh: f32) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if !conf_thresh.is_finite() {
        return Err(PipelineError::InvalidInput(format!(
            "confidence threshold must be finite, got {}",
            conf_thresh
        )));
    }

    Ok(())
}
