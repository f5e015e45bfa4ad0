pub mod adapters;
pub mod config;
pub mod fish;
pub mod model_paths;
pub mod report;

mod bounded;
mod error;
mod mask;
mod orientation;
mod region;

pub use bounded::run_bounded;
pub use config::{ConfigError, Settings};
pub use error::{CollaboratorError, PipelineError, Stage};
pub use fish::{ClassCounts, Classification, FishClass, FishPipeline, PipelineResult, Trace};
pub use mask::Mask;
pub use model_paths::{ModelPathError, ModelPaths};
pub use orientation::normalize_orientation;
pub use region::Region;
pub use report::{CountReport, InstanceReport};
