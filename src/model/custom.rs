use anyhow::{anyhow, Result};

use crate::frame::{ColorFormat, MemoryLayout, CHANNELS};
use crate::preprocess::{ChannelNormParams, PipelineBuilder, PreprocessingPipeline};

use super::{ModelProfile, DYNAMIC_DIM};

/// Image classifier described entirely by configuration.
#[derive(Clone, Debug)]
pub struct CustomProfile {
    pub name: String,
    pub height: u32,
    pub width: u32,
    pub classes: usize,
    /// Channel order the model expects. `Bgr` skips the color swap.
    pub color: ColorFormat,
    pub norm: [ChannelNormParams; CHANNELS],
    /// Drop everything up to the first space of each label line.
    pub strip_label_prefix: bool,
}

impl CustomProfile {
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(anyhow!(
                "profile {}: input size must be non-zero, got {}x{}",
                self.name,
                self.height,
                self.width
            ));
        }
        if self.classes == 0 {
            return Err(anyhow!("profile {}: classes must be > 0", self.name));
        }
        if let Some(bad) = self.norm.iter().find(|p| !p.std.is_finite() || p.std <= 0.0) {
            return Err(anyhow!(
                "profile {}: channel std must be positive and finite, got {}",
                self.name,
                bad.std
            ));
        }
        if let Some(bad) = self.norm.iter().find(|p| !p.mean.is_finite()) {
            return Err(anyhow!(
                "profile {}: channel mean must be finite, got {}",
                self.name,
                bad.mean
            ));
        }
        Ok(())
    }
}

impl ModelProfile for CustomProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> Vec<i64> {
        vec![
            DYNAMIC_DIM,
            CHANNELS as i64,
            self.height as i64,
            self.width as i64,
        ]
    }

    fn output_size(&self) -> usize {
        self.classes
    }

    fn norm_params(&self) -> [ChannelNormParams; CHANNELS] {
        self.norm
    }

    fn build_preprocess_pipeline(&self) -> PreprocessingPipeline {
        PipelineBuilder::new()
            .resize(self.height, self.width)
            .convert_color(self.color)
            .normalize(self.norm)
            .convert_layout(MemoryLayout::Chw)
            .build()
    }

    fn to_display_label(&self, raw: &str) -> String {
        if self.strip_label_prefix {
            if let Some((_, label)) = raw.split_once(' ') {
                return label.to_string();
            }
        }
        raw.trim().to_string()
    }
}
