use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Newline-delimited label file: line `i` names class `i`.
///
/// The file is read once when opened; lookups are positional.
#[derive(Clone, Debug)]
pub struct LabelStore {
    origin: PathBuf,
    lines: Vec<String>,
}

impl LabelStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not open label file {}", path.display()))?;
        Ok(Self {
            origin: path.to_path_buf(),
            lines: raw.lines().map(str::to_string).collect(),
        })
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origin: PathBuf::from("<memory>"),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Result<&str> {
        self.lines.get(index).map(String::as_str).ok_or_else(|| {
            anyhow!(
                "label file {} has no line {} ({} lines)",
                self.origin.display(),
                index,
                self.lines.len()
            )
        })
    }

    /// Fail unless every class index below `classes` has a line.
    pub fn ensure_covers(&self, classes: usize) -> Result<()> {
        if self.lines.len() < classes {
            return Err(anyhow!(
                "label file {} lists {} labels, model scores {} classes",
                self.origin.display(),
                self.lines.len(),
                classes
            ));
        }
        Ok(())
    }
}
