//! Groovebox Core - Step-sequencer playback engine.
//!
//! This crate turns grids of on/off triggers into precisely timed audio
//! trigger requests and moves between pattern roles while playing:
//!
//! - **Timing** - Step durations, tempo and speed ranges, lookahead settings
//! - **Pattern** - Trigger and volume grids, channel bindings, variations
//! - **State** - Playback state, change notification and host messages
//! - **Transition** - Intro, fill and ending logic with synchronization math
//! - **Scheduler** - Lookahead scheduling against the audio clock
//! - **Sequencer** - A playback session and its host operations
//! - **Runtime** - A sequencer on a dedicated thread
//!
//! # Architecture
//!
//! The [`LookaheadScheduler`] is the only part with a notion of "now". On
//! each tick it reads the [`PlaybackState`], hands due steps to the
//! [`AudioTriggerService`], advances the playhead and lets the
//! [`TransitionEngine`] switch roles at the right step. Hosts talk to a
//! [`Runtime`] through [`StateMessage`]s and listen for [`EngineEvent`]s.
//!
//! Groovebox does not decode, mix or output audio; that is the job of the
//! [`AudioTriggerService`] implementation.

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod pattern;
pub mod runtime;
pub mod scheduler;
pub mod sequencer;
pub mod state;
pub mod timing;
pub mod transition;

pub use audio::{AudioTriggerService, RecordingTriggerService, ScheduledStep, WallClockTriggerService};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use events::EngineEvent;
pub use pattern::{ChannelBinding, Pattern, Variation, VolumeGrid, MAX_CHANNELS};
pub use runtime::{Runtime, RuntimeHandle};
pub use scheduler::{LookaheadScheduler, TickReport};
pub use sequencer::Sequencer;
pub use state::{
    Cue, PendingTransition, PlaybackState, Role, StateChange, StateManager, StateMessage,
    StepTrigger, Topic, TriggerSource,
};
pub use timing::LookaheadSettings;
pub use transition::{Completion, RhythmChange, TransitionEngine};
