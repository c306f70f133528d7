//! State management for Groovebox.
//!
//! This module provides the playback state, its change notification and the
//! message type hosts use to request mutations.
//!
//! # Architecture
//!
//! - [`PlaybackState`] - The complete session state and its invariants
//! - [`StateChange`] / [`Topic`] - Notifications published after each mutation
//! - [`StateMessage`] - Host requests applied by the runtime thread
//! - [`StateManager`] - Thread-safe state access

mod manager;
mod messages;
mod model;
mod notify;

pub use manager::StateManager;
pub use messages::StateMessage;
pub use model::{Cue, PendingTransition, PlaybackState, Role, StepTrigger, TriggerSource};
pub use notify::{StateChange, Topic};
