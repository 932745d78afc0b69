//! Local image directory source.
//!
//! The directory is enumerated once, at construction: regular files whose extension maps
//! to a format this build can decode, sorted by path. `next_image` walks that list and
//! wraps around to the first entry after the last one. Files added or removed later are
//! not noticed.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use image::ImageFormat;

use super::{ImageSource, SourceStats};
use crate::frame::Frame;

pub struct DirectorySource {
    dir: PathBuf,
    entries: Vec<PathBuf>,
    cursor: usize,
    frames_captured: u64,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("could not read image directory {}", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("could not list image directory {}", dir.display()))?
                .path();
            if path.is_file() && is_decodable(&path) {
                entries.push(path);
            }
        }
        if entries.is_empty() {
            return Err(anyhow!(
                "image directory {} contains no images",
                dir.display()
            ));
        }
        entries.sort();

        log::info!(
            "DirectorySource: {} images in {}",
            entries.len(),
            dir.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
            cursor: 0,
            frames_captured: 0,
        })
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}

impl ImageSource for DirectorySource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn next_image(&mut self) -> Result<Frame> {
        let path = &self.entries[self.cursor];
        self.cursor = (self.cursor + 1) % self.entries.len();
        let frame = decode_bgr(path)?;
        self.frames_captured += 1;
        Ok(frame)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            location: self.describe(),
        }
    }
}

/// Known extension whose decoder is compiled into this build.
fn is_decodable(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
}

/// Decode an image file into an interleaved BGR frame.
fn decode_bgr(path: &Path) -> Result<Frame> {
    let rgb = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut pixels = rgb.into_raw();
    for pixel in pixels.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
    Frame::from_bgr8(pixels, width, height, path.display().to_string())
}
