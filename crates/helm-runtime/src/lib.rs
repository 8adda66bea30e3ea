//! # helm-runtime
//!
//! The run controller: the state machine that drives one task to completion
//! (or failure) through repeated model calls and tool invocations.
//!
//! A [`RunController`] owns every live run. Runs for different sessions
//! execute in parallel up to a configured bound; runs addressing the same
//! session are strictly serialized so at most one run ever mutates a given
//! transcript. Cancellation is cooperative and observed only at suspension
//! points.

#![deny(unsafe_code)]

pub mod context;
pub mod controller;
pub mod emitter;
pub mod errors;
pub mod types;

pub use controller::RunController;
pub use emitter::EventEmitter;
pub use errors::RunError;
pub use types::{ControllerConfig, Run, RunStatus};
