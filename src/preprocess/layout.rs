use anyhow::Result;

use super::{sample_index, Transformation};
use crate::frame::{Frame, MemoryLayout, PixelBuffer, CHANNELS};

/// Reorder samples between interleaved (HWC) and planar (CHW) layouts.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConvert {
    target: MemoryLayout,
}

impl LayoutConvert {
    pub fn new(target: MemoryLayout) -> Self {
        Self { target }
    }
}

impl Transformation for LayoutConvert {
    fn name(&self) -> &'static str {
        "convert_layout"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let from = frame.layout();
        if from == self.target {
            return Ok(());
        }

        let (width, height) = (frame.width() as usize, frame.height() as usize);
        let converted = match frame.buffer() {
            PixelBuffer::U8(data) => {
                PixelBuffer::U8(transpose(data, from, self.target, width, height))
            }
            PixelBuffer::F32(data) => {
                PixelBuffer::F32(transpose(data, from, self.target, width, height))
            }
        };
        frame.replace_buffer(converted, width as u32, height as u32)?;
        frame.set_layout(self.target);
        Ok(())
    }
}

fn transpose<T: Copy + Default>(
    src: &[T],
    from: MemoryLayout,
    to: MemoryLayout,
    width: usize,
    height: usize,
) -> Vec<T> {
    let mut out = vec![T::default(); src.len()];
    for c in 0..CHANNELS {
        for y in 0..height {
            for x in 0..width {
                out[sample_index(to, width, height, c, y, x)] =
                    src[sample_index(from, width, height, c, y, x)];
            }
        }
    }
    out
}
