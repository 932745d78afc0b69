//! Three-stage classification pipeline.
//!
//! - `capture`: paces itself, pulls the next frame from the image source, enqueues on A.
//! - `infer`: dequeues from A, preprocesses a working copy, runs the session, decodes the
//!   label, enqueues a `ClassifierResult` on B.
//! - `present`: dequeues from B, renders, holds the image for the display duration and
//!   signals termination once the display is closed.
//!
//! The stages share nothing but the two handoff queues and the termination flag. The
//! session is lent to the infer thread alone and outlives every stage. A stage that fails
//! signals termination; the first failure is returned from `Orchestrator::run`.

mod queue;
mod shutdown;

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::display::Display;
use crate::engine::Session;
use crate::frame::{ClassifierResult, Frame};
use crate::model::{LabelStore, ModelProfile};
use crate::preprocess::PreprocessingPipeline;
use crate::source::ImageSource;

pub use queue::HandoffQueue;
pub use shutdown::Termination;

pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_millis(1500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_BACKLOG_WARN: usize = 32;

/// Stage pacing.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Pause before each capture.
    pub capture_interval: Duration,
    /// How long each result stays on the display.
    pub display_duration: Duration,
    /// Upper bound on any single blocking wait; termination is re-checked after each.
    pub poll_interval: Duration,
    /// Queue depth at which a backlog warning is logged (0 disables).
    pub backlog_warn: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            display_duration: DEFAULT_DISPLAY_DURATION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backlog_warn: DEFAULT_BACKLOG_WARN,
        }
    }
}

/// What happened during one `Orchestrator::run`.
#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    pub frames_captured: u64,
    pub frames_classified: u64,
    pub results_presented: u64,
    pub termination_reason: Option<String>,
}

pub struct Orchestrator<'a> {
    settings: PipelineSettings,
    profile: &'a dyn ModelProfile,
    labels: &'a LabelStore,
    preprocess: PreprocessingPipeline,
    termination: Arc<Termination>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        settings: PipelineSettings,
        profile: &'a dyn ModelProfile,
        labels: &'a LabelStore,
    ) -> Self {
        let preprocess = profile.build_preprocess_pipeline();
        log::debug!("preprocessing for {}: {:?}", profile.name(), preprocess);
        Self {
            settings,
            profile,
            labels,
            preprocess,
            termination: Arc::new(Termination::new()),
        }
    }

    /// Shared handle to the termination flag, e.g. for a Ctrl-C handler.
    pub fn termination(&self) -> Arc<Termination> {
        Arc::clone(&self.termination)
    }

    /// Run all three stages until termination and join them.
    ///
    /// `open_display` is called on the present thread.
    pub fn run<F>(
        &self,
        source: &mut dyn ImageSource,
        session: &mut Session,
        open_display: F,
    ) -> Result<PipelineReport>
    where
        F: FnOnce() -> Result<Box<dyn Display>> + Send,
    {
        let frames: HandoffQueue<Frame> = HandoffQueue::new("frames", self.settings.backlog_warn);
        let results: HandoffQueue<ClassifierResult> =
            HandoffQueue::new("results", self.settings.backlog_warn);
        let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);

        let fail = |stage: &str, err: anyhow::Error| {
            log::error!("{} stage failed: {:#}", stage, err);
            self.termination.signal(format!("{} stage failed", stage));
            frames.wake_all();
            results.wake_all();
            if let Ok(mut slot) = first_error.lock() {
                slot.get_or_insert(err);
            }
        };

        let counts = thread::scope(|scope| -> Result<(u64, u64, u64)> {
            let capture = thread::Builder::new()
                .name("capture".into())
                .spawn_scoped(scope, || {
                    self.capture_stage(source, &frames)
                        .map_err(|err| fail("capture", err))
                        .unwrap_or_default()
                })
                .inspect_err(|_| self.spawn_failed())?;
            let infer = thread::Builder::new()
                .name("infer".into())
                .spawn_scoped(scope, || {
                    self.infer_stage(session, &frames, &results)
                        .map_err(|err| fail("infer", err))
                        .unwrap_or_default()
                })
                .inspect_err(|_| self.spawn_failed())?;
            let present = thread::Builder::new()
                .name("present".into())
                .spawn_scoped(scope, || {
                    open_display()
                        .and_then(|display| self.present_stage(display, &results))
                        .map_err(|err| fail("present", err))
                        .unwrap_or_default()
                })
                .inspect_err(|_| self.spawn_failed())?;

            let presented = join_stage(&self.termination, "present", present);
            let classified = join_stage(&self.termination, "infer", infer);
            let captured = join_stage(&self.termination, "capture", capture);
            Ok((captured?, classified?, presented?))
        });

        if let Some(err) = first_error.into_inner().ok().flatten() {
            return Err(err);
        }
        let (frames_captured, frames_classified, results_presented) = counts?;
        let report = PipelineReport {
            frames_captured,
            frames_classified,
            results_presented,
            termination_reason: self.termination.reason(),
        };
        log::info!(
            "pipeline stopped: {} captured, {} classified, {} presented",
            report.frames_captured,
            report.frames_classified,
            report.results_presented
        );
        Ok(report)
    }

    fn capture_stage(
        &self,
        source: &mut dyn ImageSource,
        frames: &HandoffQueue<Frame>,
    ) -> Result<u64> {
        log::debug!("capture stage started on {}", source.describe());
        let mut sequence = 0u64;
        while self.pause(self.settings.capture_interval) {
            let mut frame = source.next_image()?;
            frame.set_sequence(sequence);
            sequence += 1;
            log::debug!("Captured image: {}", frame.source());
            frames.push(frame)?;
        }
        let stats = source.stats();
        log::debug!(
            "capture stage stopped after {} frames from {}",
            stats.frames_captured,
            stats.location
        );
        Ok(sequence)
    }

    fn infer_stage(
        &self,
        session: &mut Session,
        frames: &HandoffQueue<Frame>,
        results: &HandoffQueue<ClassifierResult>,
    ) -> Result<u64> {
        log::debug!("infer stage started with engine {}", session.engine_name());
        let mut classified = 0u64;
        while let Some(frame) = frames.pop(&self.termination, self.settings.poll_interval)? {
            let mut input = frame.clone();
            self.preprocess.apply(&mut input)?;
            session.load_input(&input)?;

            let started = Instant::now();
            session.execute()?;
            let inference_time = started.elapsed();

            let prediction = self.profile.classify(session.scores(), self.labels)?;
            log::info!(
                "Predicted image: {} Inference Time: {}ms",
                prediction.label,
                inference_time.as_millis()
            );
            log::debug!(
                "frame #{} classified {}ms after capture",
                frame.sequence(),
                frame.age().as_millis()
            );
            results.push(ClassifierResult {
                frame,
                label: prediction.label,
                class_index: prediction.class_index,
                inference_time,
            })?;
            classified += 1;
        }
        log::debug!("infer stage stopped after {} frames", classified);
        Ok(classified)
    }

    fn present_stage(
        &self,
        mut display: Box<dyn Display>,
        results: &HandoffQueue<ClassifierResult>,
    ) -> Result<u64> {
        log::debug!("present stage started on {} display", display.name());
        let mut presented = 0u64;
        while let Some(result) = results.pop(&self.termination, self.settings.poll_interval)? {
            display.render(&result.frame, &result.title())?;
            presented += 1;
            if self.hold(display.as_mut())? {
                self.termination.signal("display closed");
                break;
            }
        }
        log::debug!("present stage stopped after {} results", presented);
        Ok(presented)
    }

    /// Hold the current image for the display duration in poll-sized slices. Returns
    /// `true` when the display asked to close.
    fn hold(&self, display: &mut dyn Display) -> Result<bool> {
        let deadline = Instant::now() + self.settings.display_duration;
        loop {
            if self.termination.is_signaled() {
                return Ok(false);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if display.wait(remaining.min(self.settings.poll_interval))? {
                return Ok(true);
            }
            if remaining.is_zero() {
                return Ok(false);
            }
        }
    }

    fn spawn_failed(&self) {
        self.termination.signal("failed to spawn stage thread");
    }

    /// Sleep for `duration` in poll-sized slices. Returns `false` if termination was
    /// signaled before or during the pause.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.termination.is_signaled() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(self.settings.poll_interval));
        }
    }
}

fn join_stage(
    termination: &Termination,
    name: &str,
    handle: thread::ScopedJoinHandle<'_, u64>,
) -> Result<u64> {
    handle.join().map_err(|_| {
        termination.signal(format!("{} thread panicked", name));
        anyhow!("{} thread panicked", name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessDisplay;
    use crate::engine::{InferenceEngine, STUB_MODEL_PREFIX};
    use crate::frame::{ColorFormat, CHANNELS};
    use crate::model::{CustomProfile, ProfileChoice};
    use crate::preprocess::ChannelNormParams;
    use crate::source::SyntheticSource;
    use std::path::Path;

    fn fast_settings() -> PipelineSettings {
        PipelineSettings {
            capture_interval: Duration::from_millis(1),
            display_duration: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
            backlog_warn: 0,
        }
    }

    fn tiny_profile() -> Box<dyn ModelProfile> {
        ProfileChoice::Custom(CustomProfile {
            name: "tiny".to_string(),
            height: 4,
            width: 4,
            classes: 3,
            color: ColorFormat::Rgb,
            norm: [ChannelNormParams::new(0.5, 0.25); CHANNELS],
            strip_label_prefix: true,
        })
        .build()
    }

    fn labels() -> LabelStore {
        LabelStore::from_lines(["n0 zero", "n1 one", "n2 two"])
    }

    #[test]
    fn headless_run_stops_after_max_results() -> Result<()> {
        let profile = tiny_profile();
        let labels = labels();
        let mut session = Session::prepare(
            Path::new(&format!("{}tiny", STUB_MODEL_PREFIX)),
            &profile.input_shape(),
            &profile.output_shape(),
            1,
        )?;
        let mut source = SyntheticSource::new(8, 6);

        let orchestrator = Orchestrator::new(fast_settings(), profile.as_ref(), &labels);
        let report = orchestrator.run(&mut source, &mut session, || {
            Ok(Box::new(HeadlessDisplay::new(Some(3))) as Box<dyn Display>)
        })?;

        assert_eq!(report.results_presented, 3);
        assert!(report.frames_classified >= 3);
        assert!(report.frames_captured >= report.frames_classified);
        assert_eq!(report.termination_reason.as_deref(), Some("display closed"));
        Ok(())
    }

    struct FailingEngine;

    impl InferenceEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn run(&mut self, _input: &[f32], _output: &mut [f32]) -> Result<()> {
            Err(anyhow!("device lost"))
        }
    }

    #[test]
    fn stage_failure_terminates_and_is_returned() -> Result<()> {
        let profile = tiny_profile();
        let labels = labels();
        let mut session =
            Session::with_engine(Box::new(FailingEngine), vec![1, 3, 4, 4], vec![1, 3])?;
        let mut source = SyntheticSource::new(8, 6);

        let orchestrator = Orchestrator::new(fast_settings(), profile.as_ref(), &labels);
        let err = orchestrator
            .run(&mut source, &mut session, || {
                Ok(Box::new(HeadlessDisplay::new(None)) as Box<dyn Display>)
            })
            .unwrap_err();

        assert!(format!("{:#}", err).contains("device lost"));
        assert_eq!(
            orchestrator.termination().reason().as_deref(),
            Some("infer stage failed")
        );
        Ok(())
    }
}
