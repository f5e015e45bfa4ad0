mod fish_class;
mod fish_counter;
mod fish_crop;
mod fish_outline;
mod fish_pipeline;

pub use fish_class::{Classification, FishClass};
pub use fish_counter::{aggregate, ClassCounts, Tally};
pub use fish_crop::{extract_crop, try_extract_crop, CropRejection, DEFAULT_MIN_AREA};
pub use fish_outline::{render_outlines, Palette, STROKE_WIDTH};
pub use fish_pipeline::{FishPipeline, PipelineResult, Rejections, Trace, TracedInstance};
