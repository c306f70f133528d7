//! A single playback session.
//!
//! The [`Sequencer`] owns one of each engine part and exposes the
//! operations a host performs: start and stop, arm fills and endings,
//! switch rhythms, queue roles and edit patterns. It is single-threaded;
//! [`Runtime`](crate::runtime::Runtime) runs one on its own thread.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::audio::AudioTriggerService;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::EngineEvent;
use crate::scheduler::LookaheadScheduler;
use crate::state::{Role, StateManager, StateMessage};
use crate::timing::LookaheadSettings;
use crate::transition::{RhythmChange, TransitionEngine};

/// Playback session driving an [`AudioTriggerService`].
pub struct Sequencer<A: AudioTriggerService> {
    state: StateManager,
    audio: A,
    scheduler: LookaheadScheduler,
    transitions: TransitionEngine,
    settings: LookaheadSettings,
    events: Option<Sender<EngineEvent>>,
}

impl<A: AudioTriggerService> Sequencer<A> {
    /// Create a session with default settings.
    pub fn new(audio: A) -> Self {
        Self::with_state(audio, StateManager::new(), LookaheadSettings::default())
    }

    /// Create a session from a configuration file's settings.
    pub fn with_config(audio: A, config: &EngineConfig) -> Self {
        let state = StateManager::new();
        state.with_state_write(|s| {
            s.set_tempo(config.tempo());
            s.set_master_volume(config.transport.master_volume);
        });
        Self::with_state(audio, state, config.lookahead())
    }

    /// Create a session on an existing state.
    pub fn with_state(audio: A, state: StateManager, settings: LookaheadSettings) -> Self {
        Self {
            state,
            audio,
            scheduler: LookaheadScheduler::new(settings.schedule_ahead_secs),
            transitions: TransitionEngine::new(),
            settings,
            events: None,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn scheduler(&self) -> &LookaheadScheduler {
        &self.scheduler
    }

    pub fn transitions(&self) -> &TransitionEngine {
        &self.transitions
    }

    pub fn settings(&self) -> LookaheadSettings {
        self.settings
    }

    /// Receive host events. Replaces any earlier subscription.
    pub fn subscribe_events(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        self.events = Some(tx);
        rx
    }

    /// Send host events to an existing channel.
    pub fn set_event_sender(&mut self, sender: Sender<EngineEvent>) {
        self.events = Some(sender);
    }

    fn emit(&mut self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                log::warn!("[SEQUENCER] Event receiver dropped, no longer reporting events");
                self.events = None;
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Whether ticks currently schedule anything.
    pub fn is_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    // === Transport ===

    /// Start playback, through the intro when it has content.
    ///
    /// Does nothing when already playing.
    pub fn play(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        self.audio
            .resume()
            .map_err(|e| Error::Audio(format!("{:#}", e)))?;

        let transitions = &mut self.transitions;
        let intro = self.state.with_state_write(|s| {
            let intro = transitions.play_intro_and_start(s);
            s.set_playing(true);
            intro
        });
        if let Some(role) = intro {
            self.emit(EngineEvent::PatternChanged(role));
        }

        let now = self.audio.current_clock();
        self.scheduler.start(now);
        log::info!(
            "[SEQUENCER] Playing at {:.1} BPM from {}",
            self.state.tempo(),
            self.state.active_role()
        );
        Ok(())
    }

    /// Stop playback and reset the transport. Idempotent.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.transitions.reset();
        let (was_playing, previous_role) = self.state.with_state_write(|s| {
            let before = (s.is_playing(), s.active_role());
            s.reset_transport();
            before
        });
        if previous_role != Role::Main {
            self.emit(EngineEvent::PatternChanged(Role::Main));
        }
        if was_playing {
            log::info!("[SEQUENCER] Stopped");
        }
    }

    /// Play when stopped, stop when playing.
    pub fn toggle_play(&mut self) -> Result<()> {
        if self.is_playing() {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Run one scheduler pass. Returns the number of steps scheduled.
    pub fn tick(&mut self) -> usize {
        if !self.scheduler.is_armed() {
            return 0;
        }

        let Self {
            state,
            audio,
            scheduler,
            transitions,
            ..
        } = self;
        let report = state.with_state_write(|s| scheduler.tick(audio, s, transitions));

        for event in report.events {
            self.emit(event);
        }
        if report.stop_requested {
            log::info!("[SEQUENCER] Ending complete");
            self.stop();
            self.emit(EngineEvent::Stopped);
        }
        report.scheduled
    }

    // === Transitions ===

    /// Arm a specific fill slot. Returns whether it was armed.
    pub fn arm_fill(&mut self, index: usize) -> bool {
        let transitions = &mut self.transitions;
        self.state
            .with_state_write(|s| transitions.activate_fill_with_timing(s, index))
    }

    /// Arm the next fill slot with content.
    pub fn play_rotating_fill(&mut self) -> bool {
        let transitions = &mut self.transitions;
        self.state.with_state_write(|s| transitions.play_rotating_fill(s))
    }

    /// Arm the ending; playback stops once it completes.
    pub fn arm_end(&mut self) -> bool {
        let transitions = &mut self.transitions;
        self.state.with_state_write(|s| transitions.play_end_and_stop(s))
    }

    /// Play a fill, then move Main to `target` or the next rhythm.
    pub fn fill_to_next_rhythm(&mut self, target: Option<usize>) -> RhythmChange {
        let transitions = &mut self.transitions;
        let (change, previous_role) = self.state.with_state_write(|s| {
            let previous = s.active_role();
            (transitions.play_fill_to_next_rhythm(s, target), previous)
        });
        if change == RhythmChange::Switched && previous_role != Role::Main {
            self.emit(EngineEvent::PatternChanged(Role::Main));
        }
        change
    }

    /// Switch the main rhythm now, keeping the cycle phase.
    pub fn activate_rhythm(&mut self, index: usize) -> bool {
        let transitions = &mut self.transitions;
        let (switched, previous_role) = self.state.with_state_write(|s| {
            let previous = s.active_role();
            (transitions.activate_rhythm(s, index), previous)
        });
        if switched && previous_role != Role::Main {
            self.emit(EngineEvent::PatternChanged(Role::Main));
        }
        switched
    }

    /// Queue a role to play after the current pattern completes.
    pub fn queue_role(&mut self, role: Role) {
        self.state.with_state_write(|s| s.queue_push(role));
    }

    /// Loop the active pattern without transitions.
    pub fn set_audition(&mut self, enabled: bool) {
        self.transitions.set_audition(enabled);
    }

    // === Messages ===

    /// Apply a host request.
    pub fn apply(&mut self, msg: StateMessage) -> Result<()> {
        match msg {
            // === Transport ===
            StateMessage::Play => self.play()?,
            StateMessage::Stop => self.stop(),
            StateMessage::TogglePlay => self.toggle_play()?,
            StateMessage::SetTempo { bpm } => self.state.with_state_write(|s| s.set_tempo(bpm)),
            StateMessage::SetMasterVolume { volume } => {
                self.state.with_state_write(|s| s.set_master_volume(volume))
            }

            // === Transitions ===
            StateMessage::ArmFill { variation } => {
                self.arm_fill(variation);
            }
            StateMessage::PlayRotatingFill => {
                self.play_rotating_fill();
            }
            StateMessage::FillToNextRhythm { target } => {
                self.fill_to_next_rhythm(target);
            }
            StateMessage::ArmEnd => {
                self.arm_end();
            }
            StateMessage::ActivateRhythm { variation } => {
                self.activate_rhythm(variation);
            }
            StateMessage::QueueRole { role } => self.queue_role(role),
            StateMessage::SetAudition { enabled } => self.set_audition(enabled),

            // === Editing ===
            StateMessage::SetEditingRole { role } => {
                self.state.with_state_write(|s| s.set_editing_role(role))
            }
            StateMessage::SelectVariation { role, variation } => self.state.with_state_write(|s| {
                s.set_current_variation(role, variation);
                s.load_variation(role, variation);
            }),
            StateMessage::SaveVariation { role, variation } => {
                self.state.with_state_write(|s| s.save_variation(role, variation))
            }
            StateMessage::StoreVariation { role, variation, data } => {
                self.state
                    .with_state_write(|s| s.store_variation(role, variation, *data))
            }
            StateMessage::ToggleStep { role, channel, step } => {
                self.state.with_state_write(|s| s.toggle_step(role, channel, step))
            }
            StateMessage::SetStep {
                role,
                channel,
                step,
                on,
            } => self.state.with_state_write(|s| s.set_step(role, channel, step, on)),
            StateMessage::SetStepVolume {
                role,
                channel,
                step,
                gain,
            } => self
                .state
                .with_state_write(|s| s.set_step_volume(role, channel, step, gain)),
            StateMessage::SetStepCount { role, steps } => {
                self.state.with_state_write(|s| s.set_step_count(role, steps))
            }
            StateMessage::SetVariationSpeed {
                role,
                variation,
                speed,
            } => self
                .state
                .with_state_write(|s| s.set_variation_speed(role, variation, speed)),
            StateMessage::BindChannel {
                role,
                channel,
                binding,
            } => self
                .state
                .with_state_write(|s| s.bind_channel(role, channel, binding)),
            StateMessage::SetCueSound { cue, binding } => {
                self.state.with_state_write(|s| s.set_cue_sound(cue, binding))
            }
        }
        Ok(())
    }
}

impl<A: AudioTriggerService> std::fmt::Debug for Sequencer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("state", &self.state)
            .field("scheduler", &self.scheduler)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingTriggerService;
    use crate::pattern::Variation;

    fn sequencer() -> Sequencer<RecordingTriggerService> {
        let seq = Sequencer::new(RecordingTriggerService::new());
        seq.state().with_state_write(|s| {
            s.set_tempo(120.0);
            s.store_variation(Role::Main, 0, Variation::new(16).with_hit(0, 0));
            s.load_variation(Role::Main, 0);
        });
        seq
    }

    #[test]
    fn test_play_resumes_and_arms() {
        let mut seq = sequencer();
        seq.play().unwrap();
        assert!(seq.is_playing());
        assert!(seq.is_armed());
        assert_eq!(seq.audio().resumes(), 1);

        // A second play is a no-op
        seq.play().unwrap();
        assert_eq!(seq.audio().resumes(), 1);
    }

    #[test]
    fn test_play_starts_with_intro() {
        let mut seq = sequencer();
        seq.state()
            .with_state_write(|s| s.store_variation(Role::Intro, 0, Variation::new(8).with_hit(0, 0)));
        let events = seq.subscribe_events();

        seq.play().unwrap();
        assert_eq!(seq.state().active_role(), Role::Intro);
        assert_eq!(events.try_recv(), Ok(EngineEvent::PatternChanged(Role::Intro)));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut seq = sequencer();
        seq.play().unwrap();
        seq.tick();
        seq.stop();
        let version = seq.state().version();
        seq.stop();
        assert_eq!(seq.state().version(), version);
        assert!(!seq.is_armed());
        assert_eq!(seq.tick(), 0);
    }

    #[test]
    fn test_toggle_play() {
        let mut seq = sequencer();
        seq.toggle_play().unwrap();
        assert!(seq.is_playing());
        seq.toggle_play().unwrap();
        assert!(!seq.is_playing());
    }

    #[test]
    fn test_apply_messages() {
        let mut seq = sequencer();
        seq.apply(StateMessage::SetTempo { bpm: 96.0 }).unwrap();
        seq.apply(StateMessage::ToggleStep {
            role: Role::Fill,
            channel: 1,
            step: 2,
        })
        .unwrap();
        seq.apply(StateMessage::SaveVariation {
            role: Role::Fill,
            variation: 1,
        })
        .unwrap();
        seq.apply(StateMessage::QueueRole { role: Role::Fill }).unwrap();
        seq.apply(StateMessage::SetAudition { enabled: true }).unwrap();

        let state = seq.state().snapshot();
        assert!((state.tempo() - 96.0).abs() < 0.001);
        assert!(state.slot_has_content(Role::Fill, 1));
        assert_eq!(state.queue().len(), 1);
        assert!(seq.transitions().is_audition());
    }

    #[test]
    fn test_rhythm_switch_reports_only_role_changes() {
        let mut seq = sequencer();
        seq.state()
            .with_state_write(|s| s.store_variation(Role::Main, 1, Variation::new(16).with_hit(1, 0)));
        let events = seq.subscribe_events();
        seq.play().unwrap();

        // No fills, so the switch is immediate; Main was already playing
        assert_eq!(seq.fill_to_next_rhythm(None), RhythmChange::Switched);
        assert_eq!(seq.state().with_state_read(|s| s.current_variation(Role::Main)), 1);
        assert!(seq.activate_rhythm(0));
        assert!(events.try_iter().all(|e| !matches!(e, EngineEvent::PatternChanged(_))));

        seq.state().with_state_write(|s| {
            s.store_variation(Role::Fill, 0, Variation::new(4).with_hit(0, 0));
            s.load_variation(Role::Fill, 0);
            s.set_active_role(Role::Fill);
        });
        assert!(seq.activate_rhythm(1));
        assert_eq!(events.try_recv(), Ok(EngineEvent::PatternChanged(Role::Main)));
    }

    #[test]
    fn test_with_config() {
        let mut config = EngineConfig::default();
        config.transport.tempo = 100.0;
        config.transport.master_volume = 0.5;
        config.scheduler.schedule_ahead_secs = 0.2;
        let seq = Sequencer::with_config(RecordingTriggerService::new(), &config);
        assert!((seq.state().tempo() - 100.0).abs() < 0.001);
        assert!((seq.scheduler().schedule_ahead() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_dropped_event_receiver_is_tolerated() {
        let mut seq = sequencer();
        drop(seq.subscribe_events());
        seq.play().unwrap();
        seq.audio_mut().advance(1.0);
        assert!(seq.tick() > 0);
    }
}
