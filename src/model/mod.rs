//! Model profiles.
//!
//! A `ModelProfile` carries everything model-specific needed to go from a captured frame to
//! a display label: the declared tensor shapes, the per-channel normalization constants, the
//! preprocessing pipeline built from them, score decoding and label post-processing.
//! The orchestrator only talks to the trait.

mod custom;
mod labels;
mod mobilenet;

use anyhow::{anyhow, Result};

use crate::frame::CHANNELS;
use crate::preprocess::{ChannelNormParams, PreprocessingPipeline};

pub use custom::CustomProfile;
pub use labels::LabelStore;
pub use mobilenet::MobileNetV2Profile;

/// Dimension value marking a dynamic (batch) axis in a declared tensor shape.
pub const DYNAMIC_DIM: i64 = -1;

/// A decoded prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
}

pub trait ModelProfile: Send + Sync {
    /// Profile identifier.
    fn name(&self) -> &str;

    /// Declared input tensor shape, batch axis first. `DYNAMIC_DIM` marks a dynamic axis.
    fn input_shape(&self) -> Vec<i64>;

    /// Declared output tensor shape, batch axis first.
    fn output_shape(&self) -> Vec<i64> {
        vec![DYNAMIC_DIM, self.output_size() as i64]
    }

    /// Number of classes scored per image.
    fn output_size(&self) -> usize;

    fn norm_params(&self) -> [ChannelNormParams; CHANNELS];

    /// The fixed resize → color → normalize → layout chain for this model.
    fn build_preprocess_pipeline(&self) -> PreprocessingPipeline;

    /// Index of the best score; the lowest index wins ties.
    fn decode(&self, scores: &[f32]) -> Option<usize> {
        argmax(scores)
    }

    /// Turn a raw label-file line into the string shown to the user.
    fn to_display_label(&self, raw: &str) -> String;

    /// Decode scores and look the winning class up in the label store.
    fn classify(&self, scores: &[f32], labels: &LabelStore) -> Result<Prediction> {
        let class_index = self
            .decode(scores)
            .ok_or_else(|| anyhow!("{}: no scores to decode", self.name()))?;
        let raw = labels.line(class_index)?;
        Ok(Prediction {
            class_index,
            label: self.to_display_label(raw),
        })
    }
}

/// Which profile to run, as selected by configuration.
#[derive(Clone, Debug)]
pub enum ProfileChoice {
    MobileNetV2,
    Custom(CustomProfile),
}

impl ProfileChoice {
    pub fn build(&self) -> Box<dyn ModelProfile> {
        match self {
            ProfileChoice::MobileNetV2 => Box::new(MobileNetV2Profile::new()),
            ProfileChoice::Custom(profile) => Box::new(profile.clone()),
        }
    }
}

/// Index of the maximum score. NaN scores never win; ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// Resolve dynamic axes in a declared shape to `batch_size`.
pub fn resolve_shape(declared: &[i64], batch_size: usize) -> Result<Vec<usize>> {
    declared
        .iter()
        .map(|&dim| match dim {
            DYNAMIC_DIM => Ok(batch_size),
            dim if dim > 0 => Ok(dim as usize),
            dim => Err(anyhow!("invalid tensor dimension {} in {:?}", dim, declared)),
        })
        .collect()
}
