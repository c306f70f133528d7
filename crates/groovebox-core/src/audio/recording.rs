//! A trigger service with a hand-driven clock.

use super::AudioTriggerService;
use crate::state::{PlaybackState, Role, StepTrigger};

/// A step handed to the audio service.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledStep {
    pub step: usize,
    pub at_time: f64,
    pub role: Role,
    /// Selected slot of `role` when the step was scheduled.
    pub variation: usize,
    pub triggers: Vec<StepTrigger>,
}

/// Records every scheduled step against a clock that only moves when told.
///
/// Used for offline rendering and for driving the engine deterministically.
#[derive(Debug, Default)]
pub struct RecordingTriggerService {
    clock: f64,
    scheduled: Vec<ScheduledStep>,
    resumes: usize,
}

impl RecordingTriggerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the clock at `seconds`.
    pub fn at(seconds: f64) -> Self {
        Self {
            clock: seconds,
            ..Self::default()
        }
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Move the clock forward.
    pub fn advance(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.clock += seconds;
        }
    }

    /// Move the clock to an absolute time. Going backwards is ignored.
    pub fn set_clock(&mut self, seconds: f64) {
        self.clock = self.clock.max(seconds);
    }

    pub fn scheduled(&self) -> &[ScheduledStep] {
        &self.scheduled
    }

    /// Drain the recorded steps.
    pub fn take_scheduled(&mut self) -> Vec<ScheduledStep> {
        std::mem::take(&mut self.scheduled)
    }

    /// How many times the service was resumed.
    pub fn resumes(&self) -> usize {
        self.resumes
    }
}

impl AudioTriggerService for RecordingTriggerService {
    fn current_clock(&self) -> f64 {
        self.clock
    }

    fn schedule_step(&mut self, step: usize, at_time: f64, state: &PlaybackState) {
        let role = state.active_role();
        self.scheduled.push(ScheduledStep {
            step,
            at_time,
            role,
            variation: state.current_variation(role),
            triggers: state.triggers_at(step),
        });
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        self.resumes += 1;
        Ok(())
    }
}
