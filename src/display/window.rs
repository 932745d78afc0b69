use anyhow::{anyhow, Result};
use minifb::{Key, Window, WindowOptions};
use std::time::{Duration, Instant};

use super::{pack_0rgb, Display};
use crate::frame::Frame;

const EVENT_INTERVAL: Duration = Duration::from_millis(16);

/// Desktop window showing the most recent result. Closing the window or pressing Escape
/// requests shutdown.
pub struct WindowDisplay {
    window: Option<Window>,
    size: (usize, usize),
}

impl WindowDisplay {
    pub fn new() -> Self {
        Self {
            window: None,
            size: (0, 0),
        }
    }
}

impl Default for WindowDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for WindowDisplay {
    fn name(&self) -> &'static str {
        "window"
    }

    fn render(&mut self, frame: &Frame, title: &str) -> Result<()> {
        let size = (frame.width() as usize, frame.height() as usize);
        // minifb cannot resize an existing window to a new buffer size
        if self.window.is_none() || self.size != size {
            let window = Window::new(title, size.0, size.1, WindowOptions::default())
                .map_err(|e| anyhow!("failed to open display window: {}", e))?;
            self.window = Some(window);
            self.size = size;
        }
        let buffer = pack_0rgb(frame)?;
        let window = self
            .window
            .as_mut()
            .ok_or_else(|| anyhow!("display window missing"))?;
        window.set_title(title);
        window
            .update_with_buffer(&buffer, size.0, size.1)
            .map_err(|e| anyhow!("failed to update display window: {}", e))
    }

    fn wait(&mut self, duration: Duration) -> Result<bool> {
        let Some(window) = self.window.as_mut() else {
            std::thread::sleep(duration);
            return Ok(false);
        };
        let deadline = Instant::now() + duration;
        loop {
            window.update();
            if !window.is_open() || window.is_key_down(Key::Escape) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(EVENT_INTERVAL.min(deadline - now));
        }
    }
}
