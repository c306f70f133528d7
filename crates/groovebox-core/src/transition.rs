//! Pattern transitions for live playback.
//!
//! The [`TransitionEngine`] decides when playback moves between roles:
//!
//! ```text
//!            intro has content
//!   play ──────────────────────► Intro ──completes──┐
//!     │                                             ▼
//!     └───────────────────────────────────────────► Main ◄────────────┐
//!                                                   │  │              │
//!                         armed fill reaches entry  │  │ armed end    │
//!                                                   ▼  ▼              │
//!                                                Fill  End ──► stop   │
//!                                                   │                 │
//!                                                   └──completes──────┘
//! ```
//!
//! Fills and endings are armed ahead of time and entered at the next Main
//! step, or at Main's downbeat when armed while another role plays.
//! The step they start from is chosen so that they finish exactly when the
//! main cycle would have, even when their step count or speed differs.
//! Switching the main rhythm keeps the position within the cycle.
//!
//! All requests that cannot be honored are ignored without an error.

use crate::state::{PendingTransition, PlaybackState, Role};
use crate::timing::base_steps;

// ============================================================================
// Synchronization Math
// ============================================================================

/// Where a pattern should start so it ends on the main cycle boundary.
///
/// `entry_step` is the main step at which the switch happens. The musical
/// time left in the main cycle from there is converted into steps of the
/// target pattern, and the target starts that many steps before its end.
pub fn synchronized_start_step(
    main_steps: usize,
    main_speed: f64,
    entry_step: usize,
    target_steps: usize,
    target_speed: f64,
) -> usize {
    if target_steps == 0 {
        return 0;
    }
    let remaining_main_steps = main_steps.saturating_sub(entry_step) as f64;
    let remaining_beats = base_steps(remaining_main_steps, main_speed);
    let to_play = (remaining_beats * target_speed).round() as usize % target_steps;
    if to_play == 0 {
        0
    } else {
        target_steps - to_play
    }
}

/// The step of a new pattern at the same cycle phase as `current_step`.
///
/// Phase is scaled by the speed ratio so a double-time pattern lands where
/// it would be had it been playing all along.
pub fn equivalent_step(
    current_step: usize,
    current_steps: usize,
    current_speed: f64,
    new_steps: usize,
    new_speed: f64,
) -> usize {
    if current_steps == 0 || new_steps == 0 {
        return 0;
    }
    let cycle_position = current_step as f64 / current_steps as f64;
    let adjusted = (cycle_position * new_speed / current_speed) % 1.0;
    ((adjusted * new_steps as f64).floor() as usize).min(new_steps - 1)
}

/// The Main step at which an armed transition takes over.
///
/// While Main plays this is the next step. While another role plays it is
/// Main's downbeat, reached when that role hands back to Main.
pub fn next_entry_point(state: &PlaybackState) -> usize {
    if state.active_role() == Role::Main {
        (state.current_step() + 1) % state.active_step_count()
    } else {
        0
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// What cycle-completion handling decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Keep looping the active role.
    Continue,
    /// Another role took over.
    RoleChanged(Role),
    /// The ending finished; playback must stop.
    Stop,
}

/// What a rhythm change request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RhythmChange {
    /// Nothing to switch to.
    Ignored,
    /// The transport is stopped; the variation was selected and loaded.
    Selected,
    /// Main switched immediately.
    Switched,
    /// The switch happens when the fill completes.
    AfterFill,
}

// ============================================================================
// Transition Engine
// ============================================================================

/// Role state machine driven by the scheduler.
#[derive(Clone, Debug, Default)]
pub struct TransitionEngine {
    /// Fill slot the next rotating fill starts looking from.
    fill_rotation: usize,
    /// Main variation to switch to once the current fill completes.
    pending_rhythm: Option<usize>,
    /// Loop the active pattern without any transitions.
    audition: bool,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_audition(&self) -> bool {
        self.audition
    }

    pub fn set_audition(&mut self, enabled: bool) {
        if self.audition != enabled {
            log::debug!("[TRANSITION] Audition mode {}", if enabled { "on" } else { "off" });
        }
        self.audition = enabled;
    }

    pub fn pending_rhythm(&self) -> Option<usize> {
        self.pending_rhythm
    }

    pub fn fill_rotation(&self) -> usize {
        self.fill_rotation
    }

    /// Forget requests tied to the session that just stopped.
    pub fn reset(&mut self) {
        self.pending_rhythm = None;
    }

    /// Choose the starting role before the transport starts.
    ///
    /// Returns `Some(Role::Intro)` when an intro will play.
    pub fn play_intro_and_start(&mut self, state: &mut PlaybackState) -> Option<Role> {
        if state.slot_has_content(Role::Intro, 0) {
            state.set_current_variation(Role::Intro, 0);
            state.load_variation(Role::Intro, 0);
            state.set_active_role(Role::Intro);
            state.reset_step();
            state.set_play_start_cue(false);
            log::debug!("[TRANSITION] Starting with intro");
            Some(Role::Intro)
        } else {
            state.set_play_start_cue(true);
            None
        }
    }

    /// Arm a fill to start at the next step.
    ///
    /// Ignored when stopped, when a fill is already armed or playing, or when
    /// the slot has no content. Returns whether the fill was armed.
    pub fn activate_fill_with_timing(&mut self, state: &mut PlaybackState, index: usize) -> bool {
        if !state.is_playing()
            || state.pending_fill().is_some()
            || state.active_role() == Role::Fill
            || !state.slot_has_content(Role::Fill, index)
        {
            log::debug!("[TRANSITION] Fill {} not armed", index);
            return false;
        }

        state.set_current_variation(Role::Fill, index);
        state.load_variation(Role::Fill, index);

        let pending = self.timed_transition(state, Role::Fill, index);
        log::debug!(
            "[TRANSITION] Fill {} armed: entry at step {}, starting at fill step {}",
            index,
            pending.entry_step,
            pending.start_step
        );
        state.set_pending_fill(Some(pending));
        true
    }

    /// Arm the ending to start at the next step.
    ///
    /// Ignored when stopped, when an end is already armed or playing, or when
    /// the end slot has no content.
    pub fn activate_end_with_timing(&mut self, state: &mut PlaybackState) -> bool {
        if !state.is_playing()
            || state.pending_end().is_some()
            || state.active_role() == Role::End
            || !state.slot_has_content(Role::End, 0)
        {
            log::debug!("[TRANSITION] End not armed");
            return false;
        }

        state.set_current_variation(Role::End, 0);
        state.load_variation(Role::End, 0);

        let pending = self.timed_transition(state, Role::End, 0);
        log::debug!(
            "[TRANSITION] End armed: entry at step {}, starting at end step {}",
            pending.entry_step,
            pending.start_step
        );
        state.set_pending_end(Some(pending));
        true
    }

    /// Arm the ending; playback stops once it completes.
    pub fn play_end_and_stop(&mut self, state: &mut PlaybackState) -> bool {
        self.activate_end_with_timing(state)
    }

    fn timed_transition(&self, state: &PlaybackState, target: Role, index: usize) -> PendingTransition {
        let entry_step = next_entry_point(state);
        let start_step = synchronized_start_step(
            state.step_count(Role::Main),
            state.speed(Role::Main),
            entry_step,
            state.step_count(target),
            state.speed(target),
        );
        PendingTransition {
            target_variation: index,
            entry_step,
            start_step,
        }
    }

    /// Arm the next fill slot with content, rotating across calls.
    pub fn play_rotating_fill(&mut self, state: &mut PlaybackState) -> bool {
        let slots = Role::Fill.slot_count();
        let Some(index) = (0..slots)
            .map(|offset| (self.fill_rotation + offset) % slots)
            .find(|&index| state.slot_has_content(Role::Fill, index))
        else {
            log::debug!("[TRANSITION] No fill has content");
            return false;
        };

        let armed = self.activate_fill_with_timing(state, index);
        if armed {
            self.fill_rotation = (index + 1) % slots;
        }
        armed
    }

    /// Play a fill, then move Main to another variation.
    ///
    /// Without a target the next main slot with content is chosen, wrapping
    /// around. When no fill has content the switch is immediate.
    pub fn play_fill_to_next_rhythm(
        &mut self,
        state: &mut PlaybackState,
        target: Option<usize>,
    ) -> RhythmChange {
        let next = match target {
            Some(index) => index,
            None => {
                let available: Vec<usize> = (0..Role::Main.slot_count())
                    .filter(|&index| state.slot_has_content(Role::Main, index))
                    .collect();
                if available.len() <= 1 {
                    log::debug!("[TRANSITION] No other rhythm to switch to");
                    return RhythmChange::Ignored;
                }
                let current = state.current_variation(Role::Main);
                let position = available.iter().position(|&index| index == current);
                available[position.map_or(0, |p| p + 1) % available.len()]
            }
        };

        if !state.slot_has_content(Role::Main, next) {
            return RhythmChange::Ignored;
        }

        if !state.is_playing() {
            self.activate_rhythm(state, next);
            return RhythmChange::Selected;
        }

        let any_fill = (0..Role::Fill.slot_count()).any(|index| state.slot_has_content(Role::Fill, index));
        if !any_fill {
            return if self.activate_rhythm(state, next) {
                RhythmChange::Switched
            } else {
                RhythmChange::Ignored
            };
        }

        log::debug!("[TRANSITION] Rhythm {} requested after fill", next);
        self.pending_rhythm = Some(next);
        self.play_rotating_fill(state);
        RhythmChange::AfterFill
    }

    /// Switch Main to another variation.
    ///
    /// While playing, Main becomes active at the step matching the current
    /// cycle phase and the queue is cleared. While stopped the variation is
    /// only selected and loaded. Returns whether playback switched.
    pub fn activate_rhythm(&mut self, state: &mut PlaybackState, index: usize) -> bool {
        if !state.slot_has_content(Role::Main, index) {
            log::debug!("[TRANSITION] Rhythm {} has no content", index);
            return false;
        }

        let current_step = state.current_step();
        let current_steps = state.step_count(Role::Main);
        let current_speed = state.speed(Role::Main);

        state.set_current_variation(Role::Main, index);
        state.load_variation(Role::Main, index);

        if !state.is_playing() {
            return false;
        }

        state.set_active_role(Role::Main);
        state.queue_clear();
        self.pending_rhythm = None;

        let new_steps = state.step_count(Role::Main);
        let step = equivalent_step(current_step, current_steps, current_speed, new_steps, state.speed(Role::Main));
        state.set_current_step(step);

        log::debug!("[TRANSITION] Rhythm {} active at step {}", index, step);
        true
    }

    /// Switch Main to a variation from step 0.
    fn activate_rhythm_from_start(&mut self, state: &mut PlaybackState, index: usize) -> bool {
        if !state.slot_has_content(Role::Main, index) {
            return false;
        }
        state.set_current_variation(Role::Main, index);
        state.load_variation(Role::Main, index);
        state.set_active_role(Role::Main);
        state.reset_step();
        state.queue_clear();
        true
    }

    /// Apply an armed transition whose entry step has been reached.
    ///
    /// Only fires while Main is active. A fill wins over an end armed for
    /// the same step; the end stays armed. Returns the new role.
    pub fn check_pending_patterns(&mut self, state: &mut PlaybackState) -> Option<Role> {
        if state.active_role() != Role::Main {
            return None;
        }
        let step = state.current_step();

        if let Some(pending) = state.pending_fill().filter(|p| p.entry_step == step) {
            state.set_active_role(Role::Fill);
            state.set_current_step(pending.start_step);
            state.set_pending_fill(None);
            log::debug!("[TRANSITION] Fill {} entered at step {}", pending.target_variation, pending.start_step);
            return Some(Role::Fill);
        }

        if let Some(pending) = state.pending_end().filter(|p| p.entry_step == step) {
            state.set_active_role(Role::End);
            state.set_current_step(pending.start_step);
            state.set_pending_end(None);
            log::debug!("[TRANSITION] End entered at step {}", pending.start_step);
            return Some(Role::End);
        }

        None
    }

    /// Decide what follows a completed cycle of the active role.
    pub fn handle_pattern_completion(&mut self, state: &mut PlaybackState) -> Completion {
        if self.audition {
            return Completion::Continue;
        }

        match state.active_role() {
            Role::Fill => {
                state.set_play_return_cue(true);
                state.set_play_start_cue(false);
                state.reset_step();

                if let Some(index) = self.pending_rhythm.take() {
                    if self.activate_rhythm_from_start(state, index) {
                        log::debug!("[TRANSITION] Fill done, rhythm {} from the top", index);
                        return Completion::RoleChanged(Role::Main);
                    }
                }
                let next = state.queue_shift().unwrap_or(Role::Main);
                state.set_active_role(next);
                log::debug!("[TRANSITION] Fill done, back to {}", next);
                Completion::RoleChanged(next)
            }
            Role::End => {
                log::debug!("[TRANSITION] End done");
                Completion::Stop
            }
            Role::Intro => {
                state.set_active_role(Role::Main);
                state.set_play_start_cue(true);
                log::debug!("[TRANSITION] Intro done");
                Completion::RoleChanged(Role::Main)
            }
            Role::Main => {
                state.set_play_start_cue(false);
                state.set_play_return_cue(false);
                match state.queue_shift() {
                    Some(next) if next != Role::Main => {
                        state.set_active_role(next);
                        log::debug!("[TRANSITION] Main done, queued {}", next);
                        Completion::RoleChanged(next)
                    }
                    _ => Completion::Continue,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Variation;

    fn playing_state() -> PlaybackState {
        let mut state = PlaybackState::new();
        state.store_variation(Role::Main, 0, Variation::new(16).with_hit(0, 0));
        state.store_variation(Role::Fill, 0, Variation::new(16).with_hit(1, 0).with_speed(2.0));
        state.store_variation(Role::End, 0, Variation::new(8).with_hit(2, 0));
        state.load_variation(Role::Main, 0);
        state.set_playing(true);
        state
    }

    #[test]
    fn test_fill_synchronization_law() {
        assert_eq!(synchronized_start_step(16, 1.0, 12, 16, 2.0), 8);
        assert_eq!(synchronized_start_step(16, 1.0, 0, 16, 1.0), 0);
        assert_eq!(synchronized_start_step(16, 1.0, 8, 16, 1.0), 8);
        // Half-time fill: 4 main steps are 2 fill steps
        assert_eq!(synchronized_start_step(16, 1.0, 12, 16, 0.5), 14);
        // Entry past the end of a shorter main never underflows
        assert_eq!(synchronized_start_step(8, 1.0, 12, 16, 1.0), 0);
    }

    #[test]
    fn test_equivalent_step_phase_continuity() {
        assert_eq!(equivalent_step(8, 16, 1.0, 32, 2.0), 0);
        assert_eq!(equivalent_step(8, 16, 1.0, 32, 1.0), 16);
        assert_eq!(equivalent_step(4, 16, 1.0, 16, 2.0), 8);
        assert_eq!(equivalent_step(15, 16, 1.0, 12, 1.0), 11);
    }

    #[test]
    fn test_arm_fill_computes_timing() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_current_step(11);

        assert!(engine.activate_fill_with_timing(&mut state, 0));
        let pending = state.pending_fill().unwrap();
        assert_eq!(pending.entry_step, 12);
        assert_eq!(pending.start_step, 8);
        assert_eq!(state.current_variation(Role::Fill), 0);
    }

    #[test]
    fn test_second_fill_is_rejected() {
        let mut state = playing_state();
        state.store_variation(Role::Fill, 1, Variation::new(8).with_hit(0, 0));
        let mut engine = TransitionEngine::new();
        state.set_current_step(3);

        assert!(engine.activate_fill_with_timing(&mut state, 0));
        let first = state.pending_fill();
        state.set_current_step(5);
        assert!(!engine.activate_fill_with_timing(&mut state, 1));
        assert_eq!(state.pending_fill(), first);
        assert_eq!(state.current_variation(Role::Fill), 0);
    }

    #[test]
    fn test_arm_rejections() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();

        // Empty slot
        assert!(!engine.activate_fill_with_timing(&mut state, 2));

        // Fill already playing
        state.set_active_role(Role::Fill);
        assert!(!engine.activate_fill_with_timing(&mut state, 0));
        state.set_active_role(Role::Main);

        // Stopped
        state.set_playing(false);
        assert!(!engine.activate_fill_with_timing(&mut state, 0));
        assert!(!engine.activate_end_with_timing(&mut state));
        assert!(state.pending_fill().is_none());
        assert!(state.pending_end().is_none());
    }

    #[test]
    fn test_end_rejected_when_pending_or_active() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        assert!(engine.play_end_and_stop(&mut state));
        assert!(!engine.activate_end_with_timing(&mut state));

        state.set_pending_end(None);
        state.set_active_role(Role::End);
        assert!(!engine.activate_end_with_timing(&mut state));
    }

    #[test]
    fn test_pending_fill_applies_at_entry() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_current_step(11);
        engine.activate_fill_with_timing(&mut state, 0);

        assert_eq!(engine.check_pending_patterns(&mut state), None);
        state.set_current_step(12);
        assert_eq!(engine.check_pending_patterns(&mut state), Some(Role::Fill));
        assert_eq!(state.active_role(), Role::Fill);
        assert_eq!(state.current_step(), 8);
        assert!(state.pending_fill().is_none());
        // Consumed transitions never fire twice
        assert_eq!(engine.check_pending_patterns(&mut state), None);
    }

    #[test]
    fn test_fill_checked_before_end() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_current_step(3);
        engine.activate_fill_with_timing(&mut state, 0);
        engine.activate_end_with_timing(&mut state);

        state.set_current_step(4);
        assert_eq!(engine.check_pending_patterns(&mut state), Some(Role::Fill));
        assert!(state.pending_end().is_some());
    }

    #[test]
    fn test_end_armed_during_long_fill_waits_for_main_downbeat() {
        let mut state = playing_state();
        state.store_variation(Role::Fill, 1, Variation::new(32).with_hit(0, 0));
        state.load_variation(Role::Fill, 1);
        state.set_active_role(Role::Fill);
        state.set_current_step(20);
        let mut engine = TransitionEngine::new();

        assert_eq!(next_entry_point(&state), 0);
        assert!(engine.activate_end_with_timing(&mut state));
        let pending = state.pending_end().unwrap();
        assert_eq!(pending.entry_step, 0);
        // A whole main cycle is left, which is a whole number of end cycles
        assert_eq!(pending.start_step, 0);
        assert_eq!(engine.check_pending_patterns(&mut state), None);

        state.set_current_step(0);
        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::Main));
        assert_eq!(engine.check_pending_patterns(&mut state), Some(Role::End));
        assert_eq!(state.active_role(), Role::End);
    }

    #[test]
    fn test_fill_completion_returns_to_main() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_active_role(Role::Fill);

        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::Main));
        assert_eq!(state.active_role(), Role::Main);
        assert!(state.play_return_cue());
        assert!(!state.play_start_cue());
    }

    #[test]
    fn test_fill_completion_pops_queue() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_active_role(Role::Fill);
        state.queue_push(Role::End);

        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::End));
        assert!(state.queue().is_empty());
    }

    #[test]
    fn test_main_completion_clears_cues_and_pops_queue() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_play_return_cue(true);
        state.set_play_start_cue(true);

        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::Continue);
        assert!(!state.play_return_cue());
        assert!(!state.play_start_cue());

        state.queue_push(Role::Fill);
        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::Fill));
        assert_eq!(state.active_role(), Role::Fill);
    }

    #[test]
    fn test_end_completion_requests_stop() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        state.set_active_role(Role::End);
        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::Stop);
    }

    #[test]
    fn test_audition_loops_active_role() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        engine.set_audition(true);
        state.set_active_role(Role::Fill);
        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::Continue);
        assert_eq!(state.active_role(), Role::Fill);
    }

    #[test]
    fn test_intro_start_and_completion() {
        let mut state = PlaybackState::new();
        let mut engine = TransitionEngine::new();
        assert_eq!(engine.play_intro_and_start(&mut state), None);
        assert!(state.play_start_cue());

        state.store_variation(Role::Intro, 0, Variation::new(8).with_hit(0, 0));
        assert_eq!(engine.play_intro_and_start(&mut state), Some(Role::Intro));
        assert_eq!(state.active_role(), Role::Intro);
        assert!(!state.play_start_cue());

        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::Main));
        assert!(state.play_start_cue());
    }

    #[test]
    fn test_activate_rhythm_keeps_phase() {
        let mut state = playing_state();
        state.store_variation(Role::Main, 1, Variation::new(32).with_hit(0, 0).with_speed(2.0));
        let mut engine = TransitionEngine::new();
        state.set_current_step(8);
        state.queue_push(Role::Fill);

        assert!(engine.activate_rhythm(&mut state, 1));
        assert_eq!(state.current_variation(Role::Main), 1);
        assert_eq!(state.step_count(Role::Main), 32);
        assert_eq!(state.current_step(), 0);
        assert!(state.queue().is_empty());
    }

    #[test]
    fn test_activate_rhythm_while_stopped_only_selects() {
        let mut state = playing_state();
        state.store_variation(Role::Main, 1, Variation::new(12).with_hit(3, 0));
        state.set_playing(false);
        let mut engine = TransitionEngine::new();

        assert!(!engine.activate_rhythm(&mut state, 1));
        assert_eq!(state.current_variation(Role::Main), 1);
        assert_eq!(state.step_count(Role::Main), 12);
        assert!(!engine.activate_rhythm(&mut state, 2));
        assert_eq!(state.current_variation(Role::Main), 1);
    }

    #[test]
    fn test_rotating_fill_cycles_slots() {
        let mut state = playing_state();
        state.store_variation(Role::Fill, 2, Variation::new(16).with_hit(0, 0));
        let mut engine = TransitionEngine::new();

        assert!(engine.play_rotating_fill(&mut state));
        assert_eq!(state.pending_fill().unwrap().target_variation, 0);
        state.set_pending_fill(None);

        // Slot 1 is empty, so the rotation skips to slot 2
        assert!(engine.play_rotating_fill(&mut state));
        assert_eq!(state.pending_fill().unwrap().target_variation, 2);
        state.set_pending_fill(None);

        assert!(engine.play_rotating_fill(&mut state));
        assert_eq!(state.pending_fill().unwrap().target_variation, 0);
    }

    #[test]
    fn test_fill_to_next_rhythm() {
        let mut state = playing_state();
        state.store_variation(Role::Main, 2, Variation::new(16).with_hit(4, 4));
        let mut engine = TransitionEngine::new();

        assert_eq!(engine.play_fill_to_next_rhythm(&mut state, None), RhythmChange::AfterFill);
        assert_eq!(engine.pending_rhythm(), Some(2));
        assert!(state.pending_fill().is_some());

        // The fill completing switches Main from the top
        state.set_pending_fill(None);
        state.set_active_role(Role::Fill);
        state.set_current_step(0);
        assert_eq!(engine.handle_pattern_completion(&mut state), Completion::RoleChanged(Role::Main));
        assert_eq!(state.current_variation(Role::Main), 2);
        assert_eq!(state.current_step(), 0);
        assert_eq!(engine.pending_rhythm(), None);
    }

    #[test]
    fn test_fill_to_next_rhythm_without_fills_switches_now() {
        let mut state = PlaybackState::new();
        state.store_variation(Role::Main, 0, Variation::new(16).with_hit(0, 0));
        state.store_variation(Role::Main, 1, Variation::new(16).with_hit(1, 0));
        state.load_variation(Role::Main, 0);
        state.set_playing(true);
        let mut engine = TransitionEngine::new();

        assert_eq!(engine.play_fill_to_next_rhythm(&mut state, None), RhythmChange::Switched);
        assert_eq!(state.current_variation(Role::Main), 1);
    }

    #[test]
    fn test_fill_to_next_rhythm_needs_two_rhythms() {
        let mut state = playing_state();
        let mut engine = TransitionEngine::new();
        assert_eq!(engine.play_fill_to_next_rhythm(&mut state, None), RhythmChange::Ignored);
        assert!(state.pending_fill().is_none());
    }

    #[test]
    fn test_rhythm_switch_drops_unreachable_fill() {
        let mut state = playing_state();
        state.store_variation(Role::Main, 1, Variation::new(8).with_hit(0, 0));
        let mut engine = TransitionEngine::new();
        state.set_current_step(13);
        engine.activate_fill_with_timing(&mut state, 0);
        assert_eq!(state.pending_fill().unwrap().entry_step, 14);

        engine.activate_rhythm(&mut state, 1);
        assert!(state.pending_fill().is_none());
    }
}
