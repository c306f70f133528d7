//! Timing primitives for the transport and the lookahead scheduler.
//!
//! This module provides the arithmetic every other part of Groovebox agrees on:
//!
//! - [`step_duration`] - Seconds occupied by one step at a tempo and speed
//! - [`clamp_tempo`] / [`clamp_speed`] - Range guards for user-facing values
//! - [`LookaheadSettings`] - How far ahead and how often the scheduler runs
//!
//! A step is half a beat at the base tempo, stretched or compressed by the
//! speed multiplier of the variation that is playing.

use std::time::Duration;

/// Slowest tempo the transport accepts.
pub const MIN_TEMPO: f64 = 40.0;
/// Fastest tempo the transport accepts.
pub const MAX_TEMPO: f64 = 240.0;
/// Tempo of a fresh session.
pub const DEFAULT_TEMPO: f64 = 80.0;

/// Slowest variation speed (quarter time).
pub const MIN_SPEED: f64 = 0.25;
/// Fastest variation speed (quadruple time).
pub const MAX_SPEED: f64 = 4.0;

/// Steps per beat at speed 1.
pub const STEPS_PER_BEAT: f64 = 2.0;

/// Default lookahead window in seconds.
pub const DEFAULT_SCHEDULE_AHEAD_SECS: f64 = 0.1;
/// Default delay between two scheduler ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Clamp a tempo into the supported range.
///
/// Non-finite input falls back to [`DEFAULT_TEMPO`].
pub fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_TEMPO, MAX_TEMPO)
    } else {
        DEFAULT_TEMPO
    }
}

/// Clamp a speed multiplier into the supported range.
///
/// Non-finite input falls back to normal speed.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        1.0
    }
}

/// Duration of one step in seconds.
///
/// For 120 BPM at speed 1: 0.25s. At speed 2: 0.125s.
#[inline]
pub fn step_duration(tempo: f64, speed: f64) -> f64 {
    (60.0 / clamp_tempo(tempo) / STEPS_PER_BEAT) / clamp_speed(speed)
}

/// Duration of a full pattern cycle in seconds.
pub fn cycle_duration(tempo: f64, step_count: usize, speed: f64) -> f64 {
    step_duration(tempo, speed) * step_count as f64
}

/// Musical length of `steps` steps at `speed`, in base-tempo steps.
///
/// This is the unit the transition engine uses to line up patterns of
/// different speeds: two spans are musically equal when their base steps are.
#[inline]
pub fn base_steps(steps: f64, speed: f64) -> f64 {
    steps / clamp_speed(speed)
}

/// Lookahead scheduler configuration.
///
/// The scheduler keeps every step whose time falls inside
/// `now + schedule_ahead_secs` handed to the audio service, and is woken
/// up again every `tick_interval`. The window must be comfortably larger
/// than the tick interval or steps will be scheduled late.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LookaheadSettings {
    /// Forward window in seconds.
    pub schedule_ahead_secs: f64,
    /// Delay between two ticks.
    pub tick_interval: Duration,
}

impl Default for LookaheadSettings {
    fn default() -> Self {
        Self {
            schedule_ahead_secs: DEFAULT_SCHEDULE_AHEAD_SECS,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl LookaheadSettings {
    /// Create settings, clamping both values to something the loop can honor.
    pub fn new(schedule_ahead_secs: f64, tick_interval: Duration) -> Self {
        let schedule_ahead_secs = if schedule_ahead_secs.is_finite() {
            schedule_ahead_secs.clamp(0.01, 1.0)
        } else {
            DEFAULT_SCHEDULE_AHEAD_SECS
        };
        Self {
            schedule_ahead_secs,
            tick_interval: tick_interval.clamp(Duration::from_millis(1), Duration::from_millis(250)),
        }
    }

    /// Whether the window covers at least two ticks.
    pub fn is_safe(&self) -> bool {
        self.schedule_ahead_secs >= 2.0 * self.tick_interval.as_secs_f64()
    }
}
