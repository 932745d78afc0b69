//! Image sources.
//!
//! - `DirectorySource`: cycles forever over the image files of a local directory.
//! - `SyntheticSource`: generated frames for `stub://` locations (tests, demos).
//!
//! Sources are constructed on the main thread before the pipeline starts, so an
//! unreadable or empty directory is reported at startup. All sources produce interleaved
//! 8-bit BGR frames.

mod directory;
mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use directory::DirectorySource;
pub use synthetic::SyntheticSource;

/// Location prefix selecting the synthetic source.
pub const STUB_SOURCE_PREFIX: &str = "stub://";

pub trait ImageSource: Send {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Next frame of the (endless) sequence.
    fn next_image(&mut self) -> Result<Frame>;

    fn stats(&self) -> SourceStats;
}

/// Statistics for an image source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub location: String,
}

/// Open the source named by `location`: `stub://WxH` or a directory path.
pub fn open_source(location: &str) -> Result<Box<dyn ImageSource>> {
    if location.starts_with(STUB_SOURCE_PREFIX) {
        Ok(Box::new(SyntheticSource::from_location(location)?))
    } else {
        Ok(Box::new(DirectorySource::new(location)?))
    }
}
