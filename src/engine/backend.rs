use anyhow::Result;

/// Inference engine trait.
///
/// An engine is bound to fixed input/output tensor shapes when it is created. `run`
/// executes one synchronous forward pass over the caller's buffers: `input` holds the
/// flattened input tensor, `output` receives the flattened scores in place.
///
/// Engines are driven from the infer stage only, so they need `Send` but not `Sync`.
pub trait InferenceEngine: Send {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Run one forward pass. Buffer lengths match the shapes the engine was built for.
    fn run(&mut self, input: &[f32], output: &mut [f32]) -> Result<()>;

    /// Optional warm-up hook, called once before the pipeline starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
