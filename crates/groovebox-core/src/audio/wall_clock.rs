//! A real-time trigger service that logs instead of playing.

use std::time::Instant;

use super::AudioTriggerService;
use crate::state::{PlaybackState, TriggerSource};

/// Clock backed by [`Instant`]; every trigger is written to the log.
///
/// Useful for headless runs and for checking timing against a real clock
/// before wiring up an audio backend.
#[derive(Debug)]
pub struct WallClockTriggerService {
    origin: Instant,
    scheduled_steps: u64,
}

impl Default for WallClockTriggerService {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClockTriggerService {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            scheduled_steps: 0,
        }
    }

    /// Steps handed over so far.
    pub fn scheduled_steps(&self) -> u64 {
        self.scheduled_steps
    }
}

impl AudioTriggerService for WallClockTriggerService {
    fn current_clock(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule_step(&mut self, step: usize, at_time: f64, state: &PlaybackState) {
        self.scheduled_steps += 1;
        let lead = at_time - self.current_clock();
        for trigger in state.triggers_at(step) {
            let name = trigger.binding.as_ref().map_or("-", |b| b.sample.as_str());
            match trigger.source {
                TriggerSource::Channel(channel) => log::debug!(
                    "[TRIGGER] t={:.3}s (+{:.3}s) {} step {} ch{} {} gain {:.2}",
                    at_time,
                    lead,
                    state.active_role(),
                    step,
                    channel,
                    name,
                    trigger.gain
                ),
                TriggerSource::Cue(cue) => log::debug!(
                    "[TRIGGER] t={:.3}s (+{:.3}s) {:?} cue {} gain {:.2}",
                    at_time,
                    lead,
                    cue,
                    name,
                    trigger.gain
                ),
            }
        }
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        log::debug!("[TRIGGER] Output resumed at {:.3}s", self.current_clock());
        Ok(())
    }
}
