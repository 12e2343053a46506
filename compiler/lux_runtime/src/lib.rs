//! Reference runtime for Lux schedules.
//!
//! Single-threaded and cooperative: [`run_frame`] walks the step list once
//! per frame, evaluating expressions into the flat value array, staging and
//! emitting draws, buffering state writes. No step suspends. On the frame
//! boundary event flags clear (one-shot semantics) and buffered state writes
//! apply, so readers observe a state writer's value from this or the
//! previous frame per the schedule contract.
//!
//! The runtime never re-inspects canonical types for dispatch — every
//! evaluation step carries its pre-resolved strategy.

mod error;
mod exec;
mod state;

pub use error::RuntimeError;
pub use exec::{run_frame, DrawItem, FrameInput, RenderFrame};
pub use state::RuntimeState;
