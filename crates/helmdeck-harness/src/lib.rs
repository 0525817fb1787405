//! Deterministic test harness for helmdeck rooms.
//!
//! Implementations of the Environment, Surface and EventHandle traits that
//! record everything and run on tokio's virtual clock, so delayed actions
//! resolve instantly and reproducibly under `start_paused` tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recording;
pub mod sim_env;

pub use recording::{RecordedReply, RecordingHandle, RecordingSurface, SurfaceCall};
pub use sim_env::SimEnv;
