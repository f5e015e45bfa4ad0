use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

/// Which collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Segmentation,
    Classification,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Detection => write!(f, "detection"),
            Stage::Segmentation => write!(f, "segmentation"),
            Stage::Classification => write!(f, "classification"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("array shape error: {0}")]
    ArrayShapeError(#[from] ndarray::ShapeError),
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("model is not loaded")]
    ModelLoadError,
    #[error("segmentor has not been primed with an image")]
    NotPrimed,
    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    OrtErr(#[from] ort::Error),
    #[error("unexpected model output: {0}")]
    OutputError(String),
    #[error("call did not finish within {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Unavailable(String),
    #[error("worker thread exited without a result")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{stage} collaborator unavailable: {source}")]
    CollaboratorUnavailable {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },
}

impl PipelineError {
    pub(crate) fn collaborator(stage: Stage) -> impl FnOnce(CollaboratorError) -> PipelineError {
        move |source| PipelineError::CollaboratorUnavailable { stage, source }
    }

    /// Client-side failures are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }
}
