use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fishcount::adapters::{FishClassifier, GatedClassifier, SamSegmentor, YoloClassifier, YoloDetector};
use fishcount::report::instance_reports;
use fishcount::{CountReport, FishPipeline, InstanceReport, ModelPaths, Settings};

#[derive(Parser)]
#[command(name = "fishcount")]
#[command(about = "Count and outline kilu and raim in an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the ONNX model files
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Minimum mask area in pixels
    #[arg(long)]
    min_area: Option<usize>,

    /// Minimum classification confidence
    #[arg(long)]
    conf_thresh: Option<f32>,

    /// Upper bound in seconds on each model call
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Also write the annotated image to this path
    #[arg(long, value_name = "FILE")]
    annotated_out: Option<PathBuf>,

    /// Include per-instance labels in the output
    #[arg(long)]
    instances: bool,
}

#[derive(Serialize)]
struct Output {
    #[serde(flatten)]
    report: CountReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    instances: Option<Vec<InstanceReport>>,
}

fn load_settings(args: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings.apply_env()?;

    if let Some(model_dir) = &args.model_dir {
        settings.models.model_dir = Some(model_dir.clone());
    }
    if let Some(min_area) = args.min_area {
        settings.pipeline.min_area = min_area;
    }
    if let Some(conf_thresh) = args.conf_thresh {
        settings.pipeline.conf_thresh = conf_thresh;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.pipeline.collaborator_timeout_secs = Some(timeout_secs);
    }
    settings.validate()?;

    Ok(settings)
}

fn build_pipeline(
    settings: &Settings,
) -> anyhow::Result<FishPipeline<YoloDetector, SamSegmentor, FishClassifier>> {
    let paths = ModelPaths::resolve(&settings.models)?;
    paths.verify()?;

    let mut detector = YoloDetector::new(paths.detector, settings.detector.clone());
    detector.load_model().context("failed to load detector")?;

    let mut segmentor = SamSegmentor::new(
        paths.segmentor_encoder,
        paths.segmentor_decoder,
        settings.segmentor.clone(),
    );
    segmentor.load_model().context("failed to load segmentor")?;

    let mut classifier = YoloClassifier::new(paths.classifier, settings.classifier.clone());
    classifier.load_model().context("failed to load classifier")?;

    Ok(
        FishPipeline::new(detector, segmentor, GatedClassifier::new(classifier))
            .with_timeout(settings.pipeline.collaborator_timeout()),
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let settings = load_settings(&args)?;

    let image = image::open(&args.image_path)
        .with_context(|| format!("failed to decode image {}", args.image_path.display()))?
        .to_rgb8();
    info!(width = image.width(), height = image.height(), "image loaded");

    let pipeline = build_pipeline(&settings)?;
    let trace = pipeline.trace(&image, settings.pipeline.min_area, settings.pipeline.conf_thresh)?;
    let result = trace.to_result(pipeline.palette());

    if let Some(path) = &args.annotated_out {
        result
            .annotated_image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let output = Output {
        report: CountReport::from_result(&result)?,
        instances: args.instances.then(|| instance_reports(&trace)),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
