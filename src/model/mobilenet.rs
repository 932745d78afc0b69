use crate::frame::{ColorFormat, MemoryLayout, CHANNELS};
use crate::preprocess::{ChannelNormParams, PipelineBuilder, PreprocessingPipeline};

use super::{ModelProfile, DYNAMIC_DIM};

const INPUT_HEIGHT: u32 = 224;
const INPUT_WIDTH: u32 = 224;
const CLASSES: usize = 1000;

/// ImageNet statistics, in RGB order.
const CHANNEL_NORM_PARAMS: [ChannelNormParams; CHANNELS] = [
    ChannelNormParams::new(0.485, 0.229),
    ChannelNormParams::new(0.456, 0.224),
    ChannelNormParams::new(0.406, 0.225),
];

/// MobileNetV2 (ONNX model zoo `mobilenetv2-12`): 224x224 RGB, planar, 1000 ImageNet
/// classes labelled by synset lines such as `n01440764 tench, Tinca tinca`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MobileNetV2Profile;

impl MobileNetV2Profile {
    pub fn new() -> Self {
        Self
    }
}

impl ModelProfile for MobileNetV2Profile {
    fn name(&self) -> &str {
        "mobilenetv2"
    }

    fn input_shape(&self) -> Vec<i64> {
        vec![
            DYNAMIC_DIM,
            CHANNELS as i64,
            INPUT_HEIGHT as i64,
            INPUT_WIDTH as i64,
        ]
    }

    fn output_size(&self) -> usize {
        CLASSES
    }

    fn norm_params(&self) -> [ChannelNormParams; CHANNELS] {
        CHANNEL_NORM_PARAMS
    }

    fn build_preprocess_pipeline(&self) -> PreprocessingPipeline {
        PipelineBuilder::new()
            .resize(INPUT_HEIGHT, INPUT_WIDTH)
            .convert_color(ColorFormat::Rgb)
            .normalize(CHANNEL_NORM_PARAMS)
            .convert_layout(MemoryLayout::Chw)
            .build()
    }

    /// Drops the synset id: everything up to and including the first space.
    fn to_display_label(&self, raw: &str) -> String {
        match raw.split_once(' ') {
            Some((_, label)) => label.to_string(),
            None => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_imagenet_shapes() {
        let profile = MobileNetV2Profile::new();
        assert_eq!(profile.input_shape(), vec![-1, 3, 224, 224]);
        assert_eq!(profile.output_shape(), vec![-1, 1000]);
        assert_eq!(profile.norm_params()[2], ChannelNormParams::new(0.406, 0.225));
    }

    #[test]
    fn display_label_strips_synset_id() {
        let profile = MobileNetV2Profile::new();
        assert_eq!(
            profile.to_display_label("n01440764 tench, Tinca tinca"),
            "tench, Tinca tinca"
        );
        assert_eq!(profile.to_display_label("unlabelled"), "unlabelled");
    }

    #[test]
    fn pipeline_follows_model_contract() {
        let pipeline = MobileNetV2Profile::new().build_preprocess_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec!["resize", "convert_color", "normalize", "convert_layout"]
        );
    }
}
