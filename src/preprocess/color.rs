use anyhow::Result;

use super::Transformation;
use crate::frame::{ColorFormat, Frame, MemoryLayout, PixelBuffer, CHANNELS};

/// BGR to RGB channel swap.
///
/// Only BGR→RGB is defined; any other combination leaves the frame as it is.
#[derive(Clone, Copy, Debug)]
pub struct ColorConvert {
    target: ColorFormat,
}

impl ColorConvert {
    pub fn new(target: ColorFormat) -> Self {
        Self { target }
    }
}

impl Transformation for ColorConvert {
    fn name(&self) -> &'static str {
        "convert_color"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        if self.target != ColorFormat::Rgb || frame.color() != ColorFormat::Bgr {
            return Ok(());
        }

        let layout = frame.layout();
        match frame.buffer_mut() {
            PixelBuffer::U8(data) => swap_outer_channels(data, layout),
            PixelBuffer::F32(data) => swap_outer_channels(data, layout),
        }
        frame.set_color(ColorFormat::Rgb);
        Ok(())
    }
}

fn swap_outer_channels<T>(data: &mut [T], layout: MemoryLayout) {
    match layout {
        MemoryLayout::Hwc => {
            for pixel in data.chunks_exact_mut(CHANNELS) {
                pixel.swap(0, 2);
            }
        }
        MemoryLayout::Chw => {
            let plane = data.len() / CHANNELS;
            let (first, rest) = data.split_at_mut(plane);
            first.swap_with_slice(&mut rest[plane..2 * plane]);
        }
    }
}
