//! The audio side of the engine.
//!
//! Groovebox never produces sound itself. It hands timed steps to an
//! [`AudioTriggerService`], which owns the clock and does the actual
//! playback:
//!
//! - [`RecordingTriggerService`] - Manually advanced clock, records every step
//! - [`WallClockTriggerService`] - Real-time clock that logs triggers

mod recording;
mod wall_clock;

pub use recording::{RecordingTriggerService, ScheduledStep};
pub use wall_clock::WallClockTriggerService;

use crate::state::PlaybackState;

/// Host audio service consumed by the scheduler.
pub trait AudioTriggerService {
    /// Monotonic clock in seconds, on the same timeline as `at_time`.
    fn current_clock(&self) -> f64;

    /// Play `step` of the active role at `at_time`.
    ///
    /// Called at most once per step, in non-decreasing time order, while
    /// the state is locked. Use [`PlaybackState::triggers_at`] to find out
    /// what sounds.
    fn schedule_step(&mut self, step: usize, at_time: f64, state: &PlaybackState);

    /// Wake the output up before playback starts.
    fn resume(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<T: AudioTriggerService + ?Sized> AudioTriggerService for Box<T> {
    fn current_clock(&self) -> f64 {
        (**self).current_clock()
    }

    fn schedule_step(&mut self, step: usize, at_time: f64, state: &PlaybackState) {
        (**self).schedule_step(step, at_time, state)
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        (**self).resume()
    }
}
