//! Groovebox Runtime - Runs playback on a dedicated thread.
//!
//! The runtime manages:
//! - The runtime thread and its lifecycle
//! - Scheduler ticks at the configured interval
//! - Message passing between the host and the engine

pub mod thread;

pub use thread::{Runtime, RuntimeHandle};
