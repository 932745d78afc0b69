//! classifierd - continuous image classification daemon
//!
//! This daemon:
//! 1. Loads configuration (file, environment, command line)
//! 2. Scans the image source and loads the label file
//! 3. Prepares the inference session and reports the model shapes
//! 4. Runs capture, infer and present until the display is closed or Ctrl-C is pressed

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

#[cfg(feature = "display-minifb")]
use frame_classifier::WindowDisplay;
use frame_classifier::{
    open_source, ClassifierConfig, Display, DisplayBackend, DisplaySettings, HeadlessDisplay,
    LabelStore, Orchestrator, Session,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "classifierd",
    about = "Classify images from a directory and display each prediction"
)]
struct Args {
    /// Config file, TOML or JSON (overrides CLASSIFIER_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Image directory, or stub://WxH for synthetic frames
    #[arg(long, value_name = "DIR")]
    images: Option<String>,

    /// ONNX model file, or stub:// for the built-in test engine
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Label file, one label per line
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Display backend (window|headless)
    #[arg(long, value_name = "BACKEND")]
    display: Option<String>,

    /// Stop after this many results (headless display)
    #[arg(long, value_name = "N")]
    max_results: Option<u64>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        load_config(&args)?
    };
    let mut source = {
        let mut stage = ui.stage("Scan images");
        let source = open_source(&cfg.images_dir)?;
        stage.set_detail(source.describe());
        source
    };
    let profile = cfg.profile.build();
    let labels = {
        let mut stage = ui.stage("Load labels");
        let labels = LabelStore::open(&cfg.labels_path)?;
        labels.ensure_covers(profile.output_size())?;
        stage.set_detail(format!("{} labels", labels.len()));
        labels
    };
    let mut session = {
        let mut stage = ui.stage("Prepare inference session");
        let mut session = Session::prepare(
            &cfg.model_path,
            &profile.input_shape(),
            &profile.output_shape(),
            cfg.batch_size,
        )?;
        session.warm_up()?;
        stage.set_detail(format!("{} on {}", profile.name(), session.engine_name()));
        session
    };
    session.log_model_info();

    let orchestrator = Orchestrator::new(cfg.pipeline.clone(), profile.as_ref(), &labels);
    let termination = orchestrator.termination();
    ctrlc::set_handler(move || {
        termination.signal("ctrl-c");
    })
    .context("failed to install Ctrl-C handler")?;

    log::info!(
        "classifierd running: {} -> {} (press Ctrl-C or close the display to stop)",
        source.describe(),
        profile.name()
    );
    let display = cfg.display.clone();
    let report = orchestrator.run(source.as_mut(), &mut session, move || {
        open_display(&display)
    })?;
    log::info!(
        "classifierd stopped: {}",
        report.termination_reason.as_deref().unwrap_or("unknown reason")
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<ClassifierConfig> {
    let mut cfg = match &args.config {
        Some(path) => ClassifierConfig::load_from(Some(path))?,
        None => ClassifierConfig::load()?,
    };
    if let Some(images) = &args.images {
        cfg.images_dir = images.clone();
    }
    if let Some(model) = &args.model {
        cfg.model_path = model.clone();
    }
    if let Some(labels) = &args.labels {
        cfg.labels_path = labels.clone();
    }
    if let Some(display) = &args.display {
        cfg.display.backend = display.parse()?;
    }
    if args.max_results.is_some() {
        cfg.display.max_results = args.max_results;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn open_display(settings: &DisplaySettings) -> Result<Box<dyn Display>> {
    match settings.backend {
        DisplayBackend::Headless => Ok(Box::new(HeadlessDisplay::new(settings.max_results))),
        #[cfg(feature = "display-minifb")]
        DisplayBackend::Window => Ok(Box::new(WindowDisplay::new())),
        #[cfg(not(feature = "display-minifb"))]
        DisplayBackend::Window => Err(anyhow::anyhow!(
            "display backend 'window' requires the display-minifb feature"
        )),
    }
}
