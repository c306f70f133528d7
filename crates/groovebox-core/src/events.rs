//! Events the engine reports to its host.
//!
//! The sequencer publishes [`EngineEvent`] values on a crossbeam channel so
//! a UI can follow playback without polling the state.

use crate::state::Role;

/// Something the host may want to react to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    /// The role driving playback changed.
    PatternChanged(Role),
    /// The ending finished; the transport has already been reset.
    Stopped,
    /// The playhead moved.
    ///
    /// `step` of `role` sounds `delay` seconds after the event was emitted,
    /// which is when a visual playhead should move to it.
    StepAdvanced { role: Role, step: usize, delay: f64 },
}
