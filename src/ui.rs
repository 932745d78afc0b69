//! Startup progress on stderr: a spinner per stage on a TTY, `==> stage` lines otherwise.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn parse(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        Self::new(UiMode::parse(ui_flag), is_tty)
    }

    fn use_spinner(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_spinner() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

/// Reports the stage as finished, with its elapsed time, when dropped.
pub struct StageGuard {
    name: String,
    detail: Option<String>,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            detail: None,
            start: Instant::now(),
            spinner,
        }
    }

    /// Extra text shown next to the stage name on completion.
    pub fn set_detail(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
    }

    fn summary(&self, elapsed: Duration) -> String {
        match &self.detail {
            Some(detail) => format!(
                "✔ {}: {} ({})",
                self.name,
                detail,
                format_duration(elapsed)
            ),
            None => format!("✔ {} ({})", self.name, format_duration(elapsed)),
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = self.summary(self.start.elapsed());
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selection() {
        assert_eq!(UiMode::parse(Some("plain")), UiMode::Plain);
        assert_eq!(UiMode::parse(Some("pretty")), UiMode::Pretty);
        assert_eq!(UiMode::parse(Some("bogus")), UiMode::Auto);
        assert!(!Ui::from_args(None, false).use_spinner());
        assert!(Ui::from_args(None, true).use_spinner());
        assert!(!Ui::from_args(Some("plain"), true).use_spinner());
    }

    #[test]
    fn summary_includes_detail_and_duration() {
        let mut guard = StageGuard::new("Scan images".to_string(), None);
        guard.set_detail("12 images");
        assert_eq!(
            guard.summary(Duration::from_millis(40)),
            "✔ Scan images: 12 images (40ms)"
        );
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
