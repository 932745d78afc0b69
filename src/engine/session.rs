use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Duration;

use super::backend::InferenceEngine;
#[cfg(feature = "backend-tract")]
use super::backends::TractEngine;
use super::backends::StubEngine;
use crate::frame::Frame;
use crate::model::resolve_shape;

/// Model path prefix selecting the built-in deterministic engine.
pub const STUB_MODEL_PREFIX: &str = "stub://";

/// An engine bound to its long-lived input and output buffers.
///
/// The session is created once before the pipeline starts and then used by the infer
/// stage alone; the buffers are reused for every frame.
pub struct Session {
    engine: Box<dyn InferenceEngine>,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    input: Vec<f32>,
    output: Vec<f32>,
}

impl Session {
    /// Load the model at `model_path` and bind buffers for the declared shapes, resolving
    /// dynamic axes to `batch_size`.
    pub fn prepare(
        model_path: &Path,
        input_shape: &[i64],
        output_shape: &[i64],
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(anyhow!("batch size must be >= 1"));
        }
        let input_shape = resolve_shape(input_shape, batch_size)?;
        let output_shape = resolve_shape(output_shape, batch_size)?;
        let engine = open_engine(model_path, &input_shape, &output_shape)?;
        Self::with_engine(engine, input_shape, output_shape)
    }

    /// Bind an already constructed engine to buffers of the given (resolved) shapes.
    pub fn with_engine(
        engine: Box<dyn InferenceEngine>,
        input_shape: Vec<usize>,
        output_shape: Vec<usize>,
    ) -> Result<Self> {
        let batch = |shape: &[usize]| shape.first().copied().unwrap_or(0);
        if batch(&input_shape) == 0 || batch(&input_shape) != batch(&output_shape) {
            return Err(anyhow!(
                "input shape {:?} and output shape {:?} must share a non-zero batch axis",
                input_shape,
                output_shape
            ));
        }
        let input = vec![0.0; input_shape.iter().product()];
        let output = vec![0.0; output_shape.iter().product()];
        Ok(Self {
            engine,
            input_shape,
            output_shape,
            input,
            output,
        })
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn batch_size(&self) -> usize {
        self.input_shape[0]
    }

    /// Copy a preprocessed frame into the first batch slot of the input buffer.
    pub fn load_input(&mut self, frame: &Frame) -> Result<()> {
        let values = frame.tensor_values()?;
        let slot_len = self.input.len() / self.batch_size();
        if values.len() != slot_len {
            return Err(anyhow!(
                "preprocessed frame {} has {} values, model input {:?} expects {} per image",
                frame.source(),
                values.len(),
                self.input_shape,
                slot_len
            ));
        }
        self.input[..slot_len].copy_from_slice(values);
        Ok(())
    }

    /// Run one forward pass over the bound buffers.
    pub fn execute(&mut self) -> Result<()> {
        self.engine.run(&self.input, &mut self.output)
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.engine.warm_up()
    }

    /// Scores of the first batch slot.
    pub fn scores(&self) -> &[f32] {
        let slot_len = self.output.len() / self.batch_size();
        &self.output[..slot_len]
    }

    pub fn log_model_info(&self) {
        log::info!("model engine: {}", self.engine.name());
        log::info!("model input shape: {:?}", self.input_shape);
        log::info!("model output shape: {:?}", self.output_shape);
    }
}

fn open_engine(
    model_path: &Path,
    input_shape: &[usize],
    output_shape: &[usize],
) -> Result<Box<dyn InferenceEngine>> {
    let location = model_path.to_string_lossy();
    if let Some(stub) = location.strip_prefix(STUB_MODEL_PREFIX) {
        let classes = output_shape.last().copied().unwrap_or(0);
        log::info!("Session: using stub engine for {}", location);
        let engine = StubEngine::new(classes).with_latency(stub_latency(stub)?);
        return Ok(Box::new(engine));
    }
    if !model_path.is_file() {
        return Err(anyhow!("model file {} not found", model_path.display()));
    }

    #[cfg(feature = "backend-tract")]
    {
        let _ = output_shape;
        Ok(Box::new(TractEngine::new(model_path, input_shape)?))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        let _ = input_shape;
        Err(anyhow!(
            "ONNX model {} requires the backend-tract feature",
            model_path.display()
        ))
    }
}

/// `stub://name?latency_ms=N` simulates an engine taking N milliseconds per pass.
fn stub_latency(stub: &str) -> Result<Duration> {
    let Some((_, query)) = stub.split_once('?') else {
        return Ok(Duration::ZERO);
    };
    match query.strip_prefix("latency_ms=") {
        Some(millis) => millis
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| anyhow!("invalid stub latency in {}{}", STUB_MODEL_PREFIX, stub)),
        None => Err(anyhow!("unknown stub model option '{}'", query)),
    }
}
