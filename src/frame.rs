//! Frame data model.
//!
//! - `Frame`: one captured image plus its dimensions, color format and memory layout.
//! - `PixelBuffer`: the frame's samples, raw `u8` as captured or `f32` once normalized.
//! - `ClassifierResult`: a frame paired with its prediction, handed to the present stage.
//!
//! A frame is owned by exactly one stage at a time and moves between stages by value.
//! Transformations mutate it in place. Any change to the dimensions goes through
//! `Frame::replace_buffer`, which swaps the samples and the recorded height/width together,
//! so `height`/`width` always describe the buffer that is actually stored.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

/// Every frame carries three color channels.
pub const CHANNELS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb,
    Bgr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryLayout {
    /// Channel-interleaved: `[y][x][c]`.
    Hwc,
    /// Planar: `[c][y][x]`.
    Chw,
}

/// Frame samples. Captured frames hold `u8`, normalized frames hold `f32`.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl PixelBuffer {
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(data) => data.len(),
            PixelBuffer::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> &'static str {
        match self {
            PixelBuffer::U8(_) => "u8",
            PixelBuffer::F32(_) => "f32",
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            PixelBuffer::U8(data) => Some(data),
            PixelBuffer::F32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            PixelBuffer::F32(data) => Some(data),
            PixelBuffer::U8(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    buffer: PixelBuffer,
    height: u32,
    width: u32,
    color: ColorFormat,
    layout: MemoryLayout,
    /// Where the frame came from (file path or synthetic source name).
    source: String,
    /// Capture order, assigned by the capture stage.
    sequence: u64,
    captured_at: Instant,
}

impl Frame {
    pub fn new(
        buffer: PixelBuffer,
        width: u32,
        height: u32,
        color: ColorFormat,
        layout: MemoryLayout,
        source: impl Into<String>,
    ) -> Result<Self> {
        check_len(&buffer, width, height)?;
        Ok(Self {
            buffer,
            height,
            width,
            color,
            layout,
            source: source.into(),
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    /// Interleaved 8-bit BGR, the layout image sources produce.
    pub fn from_bgr8(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        source: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            PixelBuffer::U8(pixels),
            width,
            height,
            ColorFormat::Bgr,
            MemoryLayout::Hwc,
            source,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> ColorFormat {
        self.color
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Time since the frame was captured.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub(crate) fn set_color(&mut self, color: ColorFormat) {
        self.color = color;
    }

    pub(crate) fn set_layout(&mut self, layout: MemoryLayout) {
        self.layout = layout;
    }

    /// Mutable samples for transformations that keep the dimensions unchanged.
    pub(crate) fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Swap in a new buffer together with its dimensions.
    ///
    /// The frame is left untouched when the buffer length does not match.
    pub(crate) fn replace_buffer(
        &mut self,
        buffer: PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<()> {
        check_len(&buffer, width, height)?;
        self.buffer = buffer;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Normalized samples, ready to be copied into an inference input buffer.
    pub fn tensor_values(&self) -> Result<&[f32]> {
        self.buffer.as_f32().ok_or_else(|| {
            anyhow!(
                "frame {} holds {} samples; normalize it before inference",
                self.source,
                self.buffer.element_type()
            )
        })
    }
}

pub(crate) fn sample_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions {}x{} overflow", width, height))
}

fn check_len(buffer: &PixelBuffer, width: u32, height: u32) -> Result<()> {
    let expected = sample_count(width, height)?;
    if buffer.len() != expected {
        return Err(anyhow!(
            "frame buffer length mismatch for {}x{}: expected {}, got {}",
            width,
            height,
            expected,
            buffer.len()
        ));
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// ClassifierResult: what the infer stage hands to the present stage
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct ClassifierResult {
    pub frame: Frame,
    pub label: String,
    pub class_index: usize,
    /// Wall-clock time spent inside the inference engine.
    pub inference_time: Duration,
}

impl ClassifierResult {
    /// Display title: prediction and inference latency.
    pub fn title(&self) -> String {
        format!(
            "{}----Inference Time: {}ms",
            self.label,
            self.inference_time.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_rejects_wrong_buffer_length() {
        let err = Frame::from_bgr8(vec![0u8; 10], 2, 2, "test").unwrap_err();
        assert!(err.to_string().contains("expected 12, got 10"));
    }

    #[test]
    fn replace_buffer_keeps_frame_on_mismatch() -> Result<()> {
        let mut frame = Frame::from_bgr8(vec![7u8; 12], 2, 2, "test")?;

        assert!(frame
            .replace_buffer(PixelBuffer::U8(vec![0u8; 5]), 3, 3)
            .is_err());
        assert_eq!((frame.width(), frame.height()), (2, 2));
        assert_eq!(frame.buffer().as_u8(), Some(&[7u8; 12][..]));

        frame.replace_buffer(PixelBuffer::U8(vec![0u8; 27]), 3, 3)?;
        assert_eq!((frame.width(), frame.height()), (3, 3));
        Ok(())
    }

    #[test]
    fn tensor_values_require_normalized_frame() -> Result<()> {
        let frame = Frame::from_bgr8(vec![0u8; 3], 1, 1, "raw")?;
        assert!(frame.tensor_values().is_err());

        let frame = Frame::new(
            PixelBuffer::F32(vec![0.5; 3]),
            1,
            1,
            ColorFormat::Rgb,
            MemoryLayout::Chw,
            "normalized",
        )?;
        assert_eq!(frame.tensor_values()?, &[0.5, 0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn result_title_carries_label_and_latency() -> Result<()> {
        let result = ClassifierResult {
            frame: Frame::from_bgr8(vec![0u8; 3], 1, 1, "a.jpg")?,
            label: "tabby, tabby cat".to_string(),
            class_index: 281,
            inference_time: Duration::from_millis(42),
        };
        assert_eq!(result.title(), "tabby, tabby cat----Inference Time: 42ms");
        Ok(())
    }
}
