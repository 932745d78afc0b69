//! Result presentation.
//!
//! - `HeadlessDisplay`: logs each result; can request close after N results.
//! - `WindowDisplay`: a desktop window via minifb (feature: display-minifb).
//!
//! Displays are created on the present thread and never leave it; window handles are not
//! `Send` on every platform.

mod headless;
#[cfg(feature = "display-minifb")]
mod window;

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use crate::frame::{ColorFormat, Frame, MemoryLayout};

pub use headless::HeadlessDisplay;
#[cfg(feature = "display-minifb")]
pub use window::WindowDisplay;

pub trait Display {
    fn name(&self) -> &'static str;

    /// Replace the shown image and title.
    fn render(&mut self, frame: &Frame, title: &str) -> Result<()>;

    /// Keep the current image up for `duration`, handling window events.
    /// Returns `true` once the user asked to close the display.
    fn wait(&mut self, duration: Duration) -> Result<bool>;
}

/// Pack interleaved 8-bit BGR/RGB pixels into the `0RGB` words windowing toolkits take.
pub fn pack_0rgb(frame: &Frame) -> Result<Vec<u32>> {
    let pixels = frame
        .buffer()
        .as_u8()
        .ok_or_else(|| anyhow!("frame {} is not 8-bit and cannot be shown", frame.source()))?;
    if frame.layout() != MemoryLayout::Hwc {
        bail!("frame {} is planar and cannot be shown", frame.source());
    }
    let (r, b) = match frame.color() {
        ColorFormat::Bgr => (2, 0),
        ColorFormat::Rgb => (0, 2),
    };
    Ok(pixels
        .chunks_exact(3)
        .map(|px| ((px[r] as u32) << 16) | ((px[1] as u32) << 8) | px[b] as u32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_bgr_pixels() -> Result<()> {
        let frame = Frame::from_bgr8(vec![0x01, 0x02, 0x03, 0xff, 0x00, 0x10], 2, 1, "bgr")?;
        assert_eq!(pack_0rgb(&frame)?, vec![0x030201, 0x1000ff]);
        Ok(())
    }
}
