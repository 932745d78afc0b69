use anyhow::{anyhow, Result};

use super::{ImageSource, SourceStats, STUB_SOURCE_PREFIX};
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;

/// Generated BGR frames for `stub://` locations.
///
/// `stub://640x480` sets the frame size; any other suffix uses 320x240. The pattern shifts
/// with every frame so consecutive frames differ.
pub struct SyntheticSource {
    location: String,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            location: format!("{}{}x{}", STUB_SOURCE_PREFIX, width, height),
            width,
            height,
            frame_count: 0,
        }
    }

    pub fn from_location(location: &str) -> Result<Self> {
        let size = location
            .strip_prefix(STUB_SOURCE_PREFIX)
            .ok_or_else(|| anyhow!("not a synthetic source location: {}", location))?;
        let (width, height) = match size.split_once('x') {
            Some((w, h)) => match (w.parse::<u32>(), h.parse::<u32>()) {
                (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
                _ => return Err(anyhow!("invalid synthetic frame size in {}", location)),
            },
            None => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
        };
        Ok(Self {
            location: location.to_string(),
            ..Self::new(width, height)
        })
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.width as usize;
        let shift = self.frame_count as usize;
        let mut pixels = Vec::with_capacity(width * self.height as usize * 3);
        for y in 0..self.height as usize {
            for x in 0..width {
                pixels.push(((x + shift) % 256) as u8);
                pixels.push(((y + shift) % 256) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }
        pixels
    }
}

impl ImageSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("{} (synthetic)", self.location)
    }

    fn next_image(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let source = format!("{}#{}", self.location, self.frame_count);
        Frame::from_bgr8(self.generate_pixels(), self.width, self.height, source)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_size_from_location() -> Result<()> {
        let mut source = SyntheticSource::from_location("stub://8x4")?;
        let frame = source.next_image()?;
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.source(), "stub://8x4#1");

        let frame = SyntheticSource::from_location("stub://camera")?.next_image()?;
        assert_eq!((frame.width(), frame.height()), (320, 240));

        assert!(SyntheticSource::from_location("stub://0x4").is_err());
        Ok(())
    }

    #[test]
    fn consecutive_frames_differ() -> Result<()> {
        let mut source = SyntheticSource::new(4, 4);
        let first = source.next_image()?;
        let second = source.next_image()?;
        assert_ne!(first.buffer(), second.buffer());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }
}
