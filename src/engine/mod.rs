//! Inference engines and the session that binds one to its buffers.
//!
//! - `InferenceEngine`: one synchronous forward pass over flat `f32` buffers.
//! - `Session`: an engine plus its long-lived input/output buffers, owned by the
//!   infer stage for the lifetime of the pipeline.
//!
//! `stub://` model paths select `StubEngine`; anything else is loaded as an ONNX file by
//! `TractEngine` (feature: backend-tract).

mod backend;
mod backends;
mod session;

pub use backend::InferenceEngine;
pub use backends::StubEngine;
#[cfg(feature = "backend-tract")]
pub use backends::TractEngine;
pub use session::{Session, STUB_MODEL_PREFIX};
