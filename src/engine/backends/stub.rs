use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::engine::backend::InferenceEngine;

/// Deterministic engine for `stub://` models.
///
/// The winning class is derived from the mean magnitude of the input tensor, so identical
/// frames always get identical predictions. An optional latency simulates a slow model.
pub struct StubEngine {
    classes: usize,
    latency: Duration,
}

impl StubEngine {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn class_for(&self, input: &[f32]) -> usize {
        if input.is_empty() {
            return 0;
        }
        let energy = input.iter().map(|v| v.abs()).sum::<f32>() / input.len() as f32;
        ((energy * 1000.0) as usize) % self.classes
    }
}

impl InferenceEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn run(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        if self.classes == 0 || output.len() % self.classes != 0 {
            return Err(anyhow!(
                "stub engine: output of {} scores is not a multiple of {} classes",
                output.len(),
                self.classes
            ));
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let batch = output.len() / self.classes;
        let per_item = input.len() / batch.max(1);
        for (slot, scores) in output.chunks_exact_mut(self.classes).enumerate() {
            let item = &input[slot * per_item..(slot + 1) * per_item];
            scores.fill(0.0);
            scores[self.class_for(item)] = 1.0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_engine_is_deterministic() -> Result<()> {
        let mut engine = StubEngine::new(10);
        let input = vec![0.25f32; 12];

        let mut first = vec![0.0; 10];
        let mut second = vec![0.5; 10];
        engine.run(&input, &mut first)?;
        engine.run(&input, &mut second)?;

        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|&&v| v == 1.0).count(), 1);
        assert_eq!(first[250 % 10], 1.0);
        Ok(())
    }

    #[test]
    fn stub_engine_honors_latency() -> Result<()> {
        let mut engine = StubEngine::new(2).with_latency(Duration::from_millis(20));
        let started = std::time::Instant::now();
        engine.run(&[1.0; 4], &mut [0.0; 2])?;
        assert!(started.elapsed() >= Duration::from_millis(20));
        Ok(())
    }

    #[test]
    fn stub_engine_rejects_mismatched_output() {
        let mut engine = StubEngine::new(10);
        let mut output = vec![0.0; 7];
        assert!(engine.run(&[0.0; 3], &mut output).is_err());
    }
}
