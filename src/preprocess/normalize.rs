use anyhow::{bail, Result};

use super::Transformation;
use crate::frame::{Frame, MemoryLayout, PixelBuffer, CHANNELS};

/// Mean and standard deviation applied to one color channel after scaling to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelNormParams {
    pub mean: f32,
    pub std: f32,
}

impl ChannelNormParams {
    pub const fn new(mean: f32, std: f32) -> Self {
        Self { mean, std }
    }
}

/// Convert interleaved `u8` samples to `(v / 255 - mean[c]) / std[c]`.
///
/// Parameters are matched to channel index, so they must follow the frame's color order
/// at this point of the pipeline. Frames that already hold `f32` samples are skipped.
#[derive(Clone, Copy, Debug)]
pub struct Normalize {
    params: [ChannelNormParams; CHANNELS],
}

impl Normalize {
    pub fn new(params: [ChannelNormParams; CHANNELS]) -> Self {
        Self { params }
    }
}

impl Transformation for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let PixelBuffer::U8(data) = frame.buffer() else {
            return Ok(());
        };
        if frame.layout() != MemoryLayout::Hwc {
            bail!("normalize expects interleaved HWC samples, got a planar u8 frame");
        }

        let values = data
            .chunks_exact(CHANNELS)
            .flat_map(|pixel| {
                pixel.iter().zip(&self.params).map(|(&v, p)| {
                    let scaled = v as f32 / 255.0;
                    (scaled - p.mean) / p.std
                })
            })
            .collect();

        let (width, height) = (frame.width(), frame.height());
        frame.replace_buffer(PixelBuffer::F32(values), width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ColorFormat;

    const PARAMS: [ChannelNormParams; 3] = [
        ChannelNormParams::new(0.5, 0.5),
        ChannelNormParams::new(0.0, 1.0),
        ChannelNormParams::new(1.0, 0.25),
    ];

    #[test]
    fn applies_per_channel_mean_and_std() -> Result<()> {
        let mut frame = Frame::from_bgr8(vec![255, 51, 0, 0, 255, 255], 2, 1, "test")?;
        Normalize::new(PARAMS).apply(&mut frame)?;

        let values = frame.buffer().as_f32().unwrap();
        let expected = [1.0, 0.2, -4.0, -1.0, 1.0, 0.0];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
        assert_eq!((frame.width(), frame.height()), (2, 1));
        Ok(())
    }

    #[test]
    fn normalized_frame_is_left_alone() -> Result<()> {
        let mut frame = Frame::from_bgr8(vec![128, 128, 128], 1, 1, "test")?;
        let normalize = Normalize::new(PARAMS);
        normalize.apply(&mut frame)?;
        let once = frame.buffer().clone();

        normalize.apply(&mut frame)?;
        assert_eq!(frame.buffer(), &once);
        Ok(())
    }

    #[test]
    fn planar_u8_frame_is_rejected() -> Result<()> {
        let mut frame = Frame::new(
            PixelBuffer::U8(vec![1, 2, 3]),
            1,
            1,
            ColorFormat::Rgb,
            MemoryLayout::Chw,
            "planar",
        )?;
        assert!(Normalize::new(PARAMS).apply(&mut frame).is_err());
        assert!(matches!(frame.buffer(), PixelBuffer::U8(_)));
        Ok(())
    }
}
