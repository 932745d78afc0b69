//! Image preprocessing.
//!
//! A `PreprocessingPipeline` is an ordered list of `Transformation`s applied in place to a
//! `Frame`. Each transformation checks the frame's current dimensions, color format,
//! element type or layout first and does nothing when the frame is already converted, so a
//! pipeline can be reapplied to its own output without changing it.
//!
//! Models build their pipeline through `PipelineBuilder` in dependency order:
//! resize, color conversion, normalization (needs interleaved `u8` samples), layout
//! conversion (last, so the buffer matches the engine's tensor shape).

mod color;
mod layout;
mod normalize;
mod resize;

use anyhow::{Context, Result};
use std::fmt;

use crate::frame::{ColorFormat, Frame, MemoryLayout, CHANNELS};

pub use color::ColorConvert;
pub use layout::LayoutConvert;
pub use normalize::{ChannelNormParams, Normalize};
pub use resize::Resize;

/// One in-place step of a preprocessing pipeline.
///
/// Configuration is fixed at construction; `apply` holds no state between frames.
pub trait Transformation: Send + Sync {
    /// Step identifier, used in logs and error context.
    fn name(&self) -> &'static str;

    /// Mutate the frame in place. Must leave the frame untouched on error.
    fn apply(&self, frame: &mut Frame) -> Result<()>;
}

#[derive(Default)]
pub struct PreprocessingPipeline {
    steps: Vec<Box<dyn Transformation>>,
}

impl PreprocessingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Transformation + 'static>(&mut self, step: T) {
        self.steps.push(Box::new(step));
    }

    /// Run every step in order, stopping at the first failure.
    pub fn apply(&self, frame: &mut Frame) -> Result<()> {
        for step in &self.steps {
            step.apply(frame)
                .with_context(|| format!("{} failed on {}", step.name(), frame.source()))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }
}

impl fmt::Debug for PreprocessingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

/// Assembles a pipeline step by step.
#[derive(Default)]
pub struct PipelineBuilder {
    pipeline: PreprocessingPipeline,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize(mut self, height: u32, width: u32) -> Self {
        self.pipeline.push(Resize::new(height, width));
        self
    }

    pub fn convert_color(mut self, target: ColorFormat) -> Self {
        self.pipeline.push(ColorConvert::new(target));
        self
    }

    pub fn normalize(mut self, params: [ChannelNormParams; CHANNELS]) -> Self {
        self.pipeline.push(Normalize::new(params));
        self
    }

    pub fn convert_layout(mut self, target: MemoryLayout) -> Self {
        self.pipeline.push(LayoutConvert::new(target));
        self
    }

    pub fn build(self) -> PreprocessingPipeline {
        self.pipeline
    }
}

// ----------------------------------------------------------------------------
// Sample helpers shared by the transformations
// ----------------------------------------------------------------------------

/// Element types a frame buffer can hold.
pub(crate) trait Sample: Copy + Default {
    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;
}

impl Sample for u8 {
    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, 255.0) as u8
    }
}

impl Sample for f32 {
    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }
}

/// Position of sample `(c, y, x)` in a `width`x`height` buffer with the given layout.
pub(crate) fn sample_index(
    layout: MemoryLayout,
    width: usize,
    height: usize,
    c: usize,
    y: usize,
    x: usize,
) -> usize {
    match layout {
        MemoryLayout::Hwc => (y * width + x) * CHANNELS + c,
        MemoryLayout::Chw => (c * height + y) * width + x,
    }
}
