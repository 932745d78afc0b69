use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use frame_classifier::{
    ChannelNormParams, ColorFormat, CustomProfile, Display, Frame, HeadlessDisplay,
    InferenceEngine, LabelStore, ModelProfile, Orchestrator, PipelineSettings, ProfileChoice,
    Session, SyntheticSource,
};

const CLASSES: usize = 3;

fn settings() -> PipelineSettings {
    PipelineSettings {
        capture_interval: Duration::from_millis(2),
        display_duration: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
        backlog_warn: 0,
    }
}

fn profile() -> Box<dyn ModelProfile> {
    ProfileChoice::Custom(CustomProfile {
        name: "tiny".to_string(),
        height: 4,
        width: 4,
        classes: CLASSES,
        color: ColorFormat::Rgb,
        norm: [ChannelNormParams::new(0.0, 1.0); 3],
        strip_label_prefix: false,
    })
    .build()
}

fn labels() -> LabelStore {
    LabelStore::from_lines(["zero", "one", "two"])
}

/// Answers class `n % CLASSES` for its n-th call, sleeping a different amount each time.
struct JitteryEngine {
    calls: usize,
    latencies: Vec<Duration>,
}

impl InferenceEngine for JitteryEngine {
    fn name(&self) -> &'static str {
        "jittery"
    }

    fn run(&mut self, _input: &[f32], output: &mut [f32]) -> Result<()> {
        std::thread::sleep(self.latencies[self.calls % self.latencies.len()]);
        output.fill(0.0);
        output[self.calls % CLASSES] = 1.0;
        self.calls += 1;
        Ok(())
    }
}

/// Records (sequence, title) of every rendered result; closes after `limit` results.
struct RecordingDisplay {
    seen: Arc<Mutex<Vec<(u64, String)>>>,
    limit: usize,
}

impl Display for RecordingDisplay {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn render(&mut self, frame: &Frame, title: &str) -> Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push((frame.sequence(), title.to_string()));
        Ok(())
    }

    fn wait(&mut self, _duration: Duration) -> Result<bool> {
        Ok(self.seen.lock().unwrap().len() >= self.limit)
    }
}

#[test]
fn results_are_presented_in_capture_order_despite_latency_jitter() -> Result<()> {
    let profile = profile();
    let labels = labels();
    let engine = JitteryEngine {
        calls: 0,
        latencies: vec![
            Duration::from_millis(25),
            Duration::from_millis(1),
            Duration::from_millis(12),
        ],
    };
    let mut session = Session::with_engine(Box::new(engine), vec![1, 3, 4, 4], vec![1, CLASSES])?;
    let mut source = SyntheticSource::new(8, 6);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let orchestrator = Orchestrator::new(settings(), profile.as_ref(), &labels);
    let display_seen = Arc::clone(&seen);
    let report = orchestrator.run(&mut source, &mut session, move || {
        Ok(Box::new(RecordingDisplay {
            seen: display_seen,
            limit: 6,
        }) as Box<dyn Display>)
    })?;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 6);
    for (position, (sequence, title)) in seen.iter().enumerate() {
        assert_eq!(*sequence, position as u64);
        let expected = ["zero", "one", "two"][position % CLASSES];
        assert!(
            title.starts_with(&format!("{}----Inference Time: ", expected)),
            "unexpected title {title}"
        );
        assert!(title.ends_with("ms"));
    }
    assert_eq!(report.results_presented, 6);
    assert_eq!(report.termination_reason.as_deref(), Some("display closed"));
    Ok(())
}

#[test]
fn external_termination_stops_every_stage() -> Result<()> {
    let profile = profile();
    let labels = labels();
    let engine = JitteryEngine {
        calls: 0,
        latencies: vec![Duration::from_millis(150)],
    };
    let mut session = Session::with_engine(Box::new(engine), vec![1, 3, 4, 4], vec![1, CLASSES])?;
    let mut source = SyntheticSource::new(8, 6);

    let orchestrator = Orchestrator::new(settings(), profile.as_ref(), &labels);
    let termination = orchestrator.termination();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        termination.signal("test shutdown");
        Instant::now()
    });

    let report = orchestrator.run(&mut source, &mut session, || {
        Ok(Box::new(HeadlessDisplay::new(None)) as Box<dyn Display>)
    })?;
    let finished = Instant::now();
    let signaled_at = stopper.join().unwrap();

    // at most one in-flight inference call plus a few poll intervals
    assert!(finished.duration_since(signaled_at) < Duration::from_millis(750));
    assert_eq!(report.termination_reason.as_deref(), Some("test shutdown"));
    assert!(report.frames_captured >= 1);
    assert!(report.frames_classified <= report.frames_captured);
    Ok(())
}

#[test]
fn display_open_failure_is_returned() {
    let profile = profile();
    let labels = labels();
    let mut session = Session::with_engine(
        Box::new(JitteryEngine {
            calls: 0,
            latencies: vec![Duration::ZERO],
        }),
        vec![1, 3, 4, 4],
        vec![1, CLASSES],
    )
    .unwrap();
    let mut source = SyntheticSource::new(8, 6);

    let orchestrator = Orchestrator::new(settings(), profile.as_ref(), &labels);
    let err = orchestrator
        .run(&mut source, &mut session, || {
            Err(anyhow::anyhow!("no display attached"))
        })
        .unwrap_err();

    assert!(err.to_string().contains("no display attached"));
    assert_eq!(
        orchestrator.termination().reason().as_deref(),
        Some("present stage failed")
    );
}
