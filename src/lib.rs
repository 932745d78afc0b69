//! Frame Classifier
//!
//! Continuously classifies images from a directory with an ONNX image classifier and
//! shows each prediction with its inference latency.
//!
//! # Architecture
//!
//! Three stages run on their own threads and hand frames to each other through FIFO
//! queues:
//!
//! 1. **Capture**: pulls the next image from the source at a fixed interval.
//! 2. **Infer**: preprocesses a copy of the frame for the model, runs the engine and
//!    decodes the top class into a label.
//! 3. **Present**: shows the frame titled with label and latency, then holds it on
//!    screen. Closing the display stops every stage.
//!
//! # Module Structure
//!
//! - `frame`: pixel buffers, frames and classification results
//! - `preprocess`: in-place transformations (resize, color, normalize, layout)
//! - `model`: model profiles and the label store
//! - `engine`: inference engines and the session that owns their buffers
//! - `source`: image sources (directory, synthetic)
//! - `display`: result presentation (window, headless)
//! - `pipeline`: queues, termination and the stage orchestrator
//! - `config`: file + environment configuration

pub mod config;
pub mod display;
pub mod engine;
pub mod frame;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod source;

pub use config::{ClassifierConfig, DisplayBackend, DisplaySettings};
pub use display::{Display, HeadlessDisplay};
#[cfg(feature = "display-minifb")]
pub use display::WindowDisplay;
pub use engine::{InferenceEngine, Session, StubEngine};
#[cfg(feature = "backend-tract")]
pub use engine::TractEngine;
pub use frame::{ClassifierResult, ColorFormat, Frame, MemoryLayout, PixelBuffer};
pub use model::{
    CustomProfile, LabelStore, MobileNetV2Profile, ModelProfile, Prediction, ProfileChoice,
};
pub use pipeline::{HandoffQueue, Orchestrator, PipelineReport, PipelineSettings, Termination};
pub use preprocess::{ChannelNormParams, PipelineBuilder, PreprocessingPipeline, Transformation};
pub use source::{open_source, DirectorySource, ImageSource, SyntheticSource};
