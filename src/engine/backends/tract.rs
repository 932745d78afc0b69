#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::engine::backend::InferenceEngine;

/// Tract-based engine for ONNX models.
///
/// The model is loaded from a local file, its first input is pinned to the resolved input
/// shape, and the optimized plan is reused for every forward pass.
pub struct TractEngine {
    model: TypedRunnableModel<TypedModel>,
    input_shape: Vec<usize>,
}

impl TractEngine {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_shape: &[usize]) -> Result<Self> {
        let model_path = model_path.as_ref();
        let shape: TVec<usize> = input_shape.iter().copied().collect();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_shape: input_shape.to_vec(),
        })
    }
}

impl InferenceEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn run(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        let tensor = Tensor::from_shape(&self.input_shape, input)
            .context("input buffer does not match the model input shape")?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let first = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = first
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        if scores.len() != output.len() {
            return Err(anyhow!(
                "model produced {} scores, output buffer holds {}",
                scores.len(),
                output.len()
            ));
        }
        for (slot, score) in output.iter_mut().zip(scores.iter()) {
            *slot = *score;
        }
        Ok(())
    }

    fn warm_up(&mut self) -> Result<()> {
        let len = self.input_shape.iter().product();
        let zeros = vec![0.0f32; len];
        let tensor = Tensor::from_shape(&self.input_shape, &zeros)?;
        self.model
            .run(tvec!(tensor.into()))
            .context("ONNX warm-up run failed")?;
        Ok(())
    }
}
