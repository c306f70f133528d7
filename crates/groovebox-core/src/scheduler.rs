//! Lookahead step scheduler.
//!
//! The scheduler turns musical steps into absolute audio-clock times. On
//! every tick it hands all steps falling inside a short forward window to
//! the [`AudioTriggerService`], advancing the playhead and letting the
//! [`TransitionEngine`] act after each one. Step times are accumulated
//! rather than re-derived from the clock, so a steady pattern never
//! drifts; a speed change re-anchors the timeline on the clock instead.

use crate::audio::AudioTriggerService;
use crate::events::EngineEvent;
use crate::state::PlaybackState;
use crate::timing::{step_duration, DEFAULT_SCHEDULE_AHEAD_SECS};
use crate::transition::{Completion, TransitionEngine};

/// Upper bound on steps handed over in one tick.
///
/// Only reached when the clock jumped far ahead; the backlog is then
/// worked off over the following ticks.
pub const MAX_STEPS_PER_TICK: usize = 256;

/// What a tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Steps handed to the audio service.
    pub scheduled: usize,
    /// Events for the host, in order.
    pub events: Vec<EngineEvent>,
    /// The ending completed; the caller must stop the transport.
    pub stop_requested: bool,
}

/// Keeps the audio service fed a fixed window ahead of its clock.
#[derive(Clone, Debug)]
pub struct LookaheadScheduler {
    /// Audio-clock time of the next step to schedule.
    next_step_time: f64,
    /// Time of the last step handed over.
    last_scheduled_time: Option<f64>,
    /// Forward window in seconds.
    schedule_ahead: f64,
    armed: bool,
}

impl Default for LookaheadScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEDULE_AHEAD_SECS)
    }
}

impl LookaheadScheduler {
    /// Create a disarmed scheduler with the given window in seconds.
    pub fn new(schedule_ahead: f64) -> Self {
        Self {
            next_step_time: 0.0,
            last_scheduled_time: None,
            schedule_ahead,
            armed: false,
        }
    }

    /// Arm the scheduler; the current step plays at `now`.
    pub fn start(&mut self, now: f64) {
        self.next_step_time = now;
        self.last_scheduled_time = None;
        self.armed = true;
        log::debug!("[SCHEDULER] Started at {:.3}s", now);
    }

    /// Disarm the scheduler. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.armed {
            log::debug!("[SCHEDULER] Stopped");
        }
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    pub fn schedule_ahead(&self) -> f64 {
        self.schedule_ahead
    }

    pub fn set_schedule_ahead(&mut self, seconds: f64) {
        self.schedule_ahead = seconds;
    }

    /// Schedule every step due within the window.
    ///
    /// Does nothing while disarmed. Stops early when the transport is no
    /// longer playing or the ending completes.
    pub fn tick<A>(
        &mut self,
        audio: &mut A,
        state: &mut PlaybackState,
        transitions: &mut TransitionEngine,
    ) -> TickReport
    where
        A: AudioTriggerService + ?Sized,
    {
        let mut report = TickReport::default();
        if !self.armed {
            return report;
        }

        let now = audio.current_clock();
        while state.is_playing() && self.next_step_time < now + self.schedule_ahead {
            if report.scheduled == MAX_STEPS_PER_TICK {
                log::warn!(
                    "[SCHEDULER] {} steps behind the clock, catching up next tick",
                    ((now - self.next_step_time) / step_duration(state.tempo(), state.active_speed())).ceil()
                );
                break;
            }

            let step = state.current_step();
            let at_time = self.next_step_time;
            audio.schedule_step(step, at_time, state);
            self.last_scheduled_time = Some(at_time);
            report.scheduled += 1;
            log::trace!("[SCHEDULER] {} step {} at {:.4}s", state.active_role(), step, at_time);

            if !self.advance(audio, state, transitions, &mut report) {
                self.armed = false;
                report.stop_requested = true;
                break;
            }
        }

        report
    }

    /// Move to the next step and compute its time.
    ///
    /// Returns false when the ending completed.
    fn advance<A>(
        &mut self,
        audio: &A,
        state: &mut PlaybackState,
        transitions: &mut TransitionEngine,
        report: &mut TickReport,
    ) -> bool
    where
        A: AudioTriggerService + ?Sized,
    {
        let speed_before = state.active_speed();
        let duration = step_duration(state.tempo(), speed_before);

        let next = (state.current_step() + 1) % state.active_step_count();
        state.set_current_step(next);

        match transitions.check_pending_patterns(state) {
            Some(role) => report.events.push(EngineEvent::PatternChanged(role)),
            None if next == 0 => match transitions.handle_pattern_completion(state) {
                Completion::Continue => {}
                Completion::RoleChanged(role) => {
                    report.events.push(EngineEvent::PatternChanged(role));
                    // Transitions armed during a fill or intro wait for Main's downbeat
                    if let Some(role) = transitions.check_pending_patterns(state) {
                        report.events.push(EngineEvent::PatternChanged(role));
                    }
                }
                Completion::Stop => return false,
            },
            None => {}
        }

        let speed_after = state.active_speed();
        if (speed_after - speed_before).abs() > f64::EPSILON {
            let new_duration = step_duration(state.tempo(), speed_after);
            let resynced = audio.current_clock() + new_duration;
            // Never schedule before a step already handed over
            self.next_step_time = match self.last_scheduled_time {
                Some(last) if resynced <= last => last + new_duration,
                _ => resynced,
            };
            log::debug!(
                "[SCHEDULER] Speed {}x -> {}x, next step at {:.4}s",
                speed_before,
                speed_after,
                self.next_step_time
            );
        } else {
            self.next_step_time += duration;
        }

        report.events.push(EngineEvent::StepAdvanced {
            role: state.active_role(),
            step: state.current_step(),
            delay: (self.next_step_time - audio.current_clock()).max(0.0),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingTriggerService;
    use crate::pattern::Variation;
    use crate::state::Role;

    fn state_at(tempo: f64) -> PlaybackState {
        let mut state = PlaybackState::new();
        state.store_variation(Role::Main, 0, Variation::new(16).with_hit(0, 0));
        state.load_variation(Role::Main, 0);
        state.set_tempo(tempo);
        state.set_playing(true);
        state
    }

    #[test]
    fn test_disarmed_tick_does_nothing() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(120.0);
        let mut transitions = TransitionEngine::new();

        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert_eq!(report, TickReport::default());
        assert!(audio.scheduled().is_empty());
    }

    #[test]
    fn test_schedules_only_inside_window() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(120.0);
        let mut transitions = TransitionEngine::new();

        scheduler.start(audio.current_clock());
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert_eq!(report.scheduled, 1);
        assert_eq!(state.current_step(), 1);
        assert!((scheduler.next_step_time() - 0.25).abs() < 1e-12);

        // 0.25 is not inside [0.125, 0.225)
        audio.advance(0.125);
        assert_eq!(scheduler.tick(&mut audio, &mut state, &mut transitions).scheduled, 0);

        audio.advance(0.05);
        assert_eq!(scheduler.tick(&mut audio, &mut state, &mut transitions).scheduled, 1);
        let times: Vec<f64> = audio.scheduled().iter().map(|s| s.at_time).collect();
        assert_eq!(times, vec![0.0, 0.25]);
    }

    #[test]
    fn test_step_advanced_carries_delay() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(120.0);
        let mut transitions = TransitionEngine::new();

        scheduler.start(0.0);
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        match report.events.as_slice() {
            [EngineEvent::StepAdvanced { role, step, delay }] => {
                assert_eq!(*role, Role::Main);
                assert_eq!(*step, 1);
                assert!((delay - 0.25).abs() < 1e-12);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_stops_when_transport_stops() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(120.0);
        let mut transitions = TransitionEngine::new();

        scheduler.start(0.0);
        state.set_playing(false);
        assert_eq!(scheduler.tick(&mut audio, &mut state, &mut transitions).scheduled, 0);
    }

    #[test]
    fn test_end_completion_stops_scheduling() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(240.0);
        state.store_variation(Role::End, 0, Variation::new(2).with_hit(0, 0));
        state.load_variation(Role::End, 0);
        state.set_active_role(Role::End);
        let mut transitions = TransitionEngine::new();

        scheduler.start(0.0);
        // Window far larger than the two-step ending
        scheduler.set_schedule_ahead(10.0);
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert_eq!(report.scheduled, 2);
        assert!(report.stop_requested);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(240.0);
        let mut transitions = TransitionEngine::new();

        scheduler.start(0.0);
        audio.advance(1000.0);
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert_eq!(report.scheduled, MAX_STEPS_PER_TICK);
        assert!(scheduler.is_armed());
    }

    #[test]
    fn test_end_armed_during_fill_enters_on_main_downbeat() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::at(5.0);
        let mut state = state_at(240.0);
        state.store_variation(Role::Fill, 0, Variation::new(4).with_hit(1, 0));
        state.store_variation(Role::End, 0, Variation::new(8).with_hit(2, 0));
        state.load_variation(Role::Fill, 0);
        state.set_active_role(Role::Fill);
        let mut transitions = TransitionEngine::new();

        scheduler.start(audio.current_clock());
        scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert!(transitions.activate_end_with_timing(&mut state));
        assert_eq!(state.pending_end().unwrap().entry_step, 0);

        scheduler.set_schedule_ahead(10.0);
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert!(report.stop_requested);
        let roles: Vec<Role> = audio.scheduled().iter().map(|s| s.role).collect();
        let mut expected = vec![Role::Fill; 4];
        expected.extend([Role::End; 8]);
        assert_eq!(roles, expected);
        assert!(audio.scheduled()[0].at_time >= 5.0);

        let changes: Vec<Role> = report
            .events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::PatternChanged(role) => Some(*role),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![Role::Main, Role::End]);
    }

    #[test]
    fn test_speed_change_resyncs_to_clock() {
        let mut scheduler = LookaheadScheduler::default();
        let mut audio = RecordingTriggerService::new();
        let mut state = state_at(120.0);
        state.store_variation(Role::Fill, 0, Variation::new(16).with_hit(1, 0).with_speed(2.0));
        let mut transitions = TransitionEngine::new();

        scheduler.start(0.0);
        scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert!(transitions.activate_fill_with_timing(&mut state, 0));
        assert_eq!(state.pending_fill().unwrap().entry_step, 2);

        // Schedules main step 1 at 0.25, then enters the fill
        audio.set_clock(0.2);
        let report = scheduler.tick(&mut audio, &mut state, &mut transitions);
        assert_eq!(report.scheduled, 1);
        assert!(report.events.contains(&EngineEvent::PatternChanged(Role::Fill)));
        assert_eq!(state.active_role(), Role::Fill);
        // Re-anchored on the clock with the fill's step duration
        assert!((scheduler.next_step_time() - 0.325).abs() < 1e-12);
    }
}
