use anyhow::Result;
use std::time::Duration;

use super::Display;
use crate::frame::Frame;

/// Display without a window. Each rendered result is logged; with `max_results` set the
/// display requests close once that many results were rendered.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    rendered: u64,
    max_results: Option<u64>,
    last_title: Option<String>,
}

impl HeadlessDisplay {
    pub fn new(max_results: Option<u64>) -> Self {
        Self {
            rendered: 0,
            max_results,
            last_title: None,
        }
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn last_title(&self) -> Option<&str> {
        self.last_title.as_deref()
    }

    fn close_requested(&self) -> bool {
        self.max_results.is_some_and(|max| self.rendered >= max)
    }
}

impl Display for HeadlessDisplay {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn render(&mut self, frame: &Frame, title: &str) -> Result<()> {
        self.rendered += 1;
        log::debug!(
            "headless display: {} ({}x{}) {}",
            frame.source(),
            frame.width(),
            frame.height(),
            title
        );
        self.last_title = Some(title.to_string());
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> Result<bool> {
        if self.close_requested() {
            return Ok(true);
        }
        std::thread::sleep(duration);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_close_after_max_results() -> Result<()> {
        let frame = Frame::from_bgr8(vec![0; 3], 1, 1, "one")?;
        let mut display = HeadlessDisplay::new(Some(2));
        display.render(&frame, "first")?;
        assert!(!display.wait(Duration::ZERO)?);
        display.render(&frame, "second")?;
        assert!(display.wait(Duration::ZERO)?);
        assert_eq!(display.last_title(), Some("second"));
        assert_eq!(display.rendered(), 2);

        let mut unbounded = HeadlessDisplay::new(None);
        unbounded.render(&frame, "x")?;
        assert!(!unbounded.wait(Duration::ZERO)?);
        Ok(())
    }
}
