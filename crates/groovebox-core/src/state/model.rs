//! State model types for Groovebox.
//!
//! [`PlaybackState`] is the single source of truth for a playback session:
//! transport, per-role variations and slots, queued roles, armed
//! transitions and cue sounds. It enforces its own invariants and publishes
//! a [`StateChange`] for every mutation.

use std::collections::VecDeque;
use std::fmt;

use crossbeam_channel::Receiver;

use super::notify::{StateChange, Subscribers, Topic};
use crate::pattern::{ChannelBinding, Variation, MAX_CHANNELS};
use crate::timing::{clamp_tempo, DEFAULT_TEMPO};

/// A named pattern role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Intro,
    Main,
    Fill,
    End,
}

impl Role {
    /// Every role, in slot-array order.
    pub const ALL: [Role; 4] = [Role::Intro, Role::Main, Role::Fill, Role::End];

    /// Number of variation slots the role owns.
    pub fn slot_count(self) -> usize {
        match self {
            Role::Intro | Role::End => 1,
            Role::Main | Role::Fill => 3,
        }
    }

    /// Step count of the role's live variation in a fresh session.
    pub fn default_step_count(self) -> usize {
        match self {
            Role::End => 8,
            _ => crate::pattern::DEFAULT_STEP_COUNT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Intro => "intro",
            Role::Main => "main",
            Role::Fill => "fill",
            Role::End => "end",
        }
    }

    fn index(self) -> usize {
        match self {
            Role::Intro => 0,
            Role::Main => 1,
            Role::Fill => 2,
            Role::End => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fill or end that has been armed and waits for its entry step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    /// Slot of the target role to play.
    pub target_variation: usize,
    /// Step of the active role at which the switch happens.
    pub entry_step: usize,
    /// Step of the target role playback jumps to.
    pub start_step: usize,
}

/// Cue sounds that mark the start of a pattern and the return from a fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    Start,
    Return,
}

/// Where a trigger comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// A pattern channel.
    Channel(usize),
    /// A cue sound.
    Cue(Cue),
}

/// One sound due at a step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepTrigger {
    pub source: TriggerSource,
    /// What to play; `None` for channels that have nothing bound yet.
    pub binding: Option<ChannelBinding>,
    /// Cell gain multiplied by the master volume.
    pub gain: f32,
}

#[derive(Clone, Debug)]
struct RoleState {
    /// The variation being played and edited.
    live: Variation,
    /// Saved variations. `None` means never saved.
    slots: Vec<Option<Variation>>,
    /// Selected slot.
    current: usize,
}

impl RoleState {
    fn new(role: Role) -> Self {
        Self {
            live: Variation::new(role.default_step_count()),
            slots: vec![None; role.slot_count()],
            current: 0,
        }
    }
}

/// Central state of a playback session.
///
/// Invariant: `current_step < step_count(active_role)`. Every mutation that
/// could break it (shrinking or reloading the active role, switching roles)
/// resets the step to 0. Out-of-range indices are ignored.
#[derive(Clone, Debug)]
pub struct PlaybackState {
    version: u64,
    is_playing: bool,
    current_step: usize,
    tempo: f64,
    master_volume: f32,
    active_role: Role,
    editing_role: Role,
    roles: [RoleState; 4],
    role_queue: VecDeque<Role>,
    pending_fill: Option<PendingTransition>,
    pending_end: Option<PendingTransition>,
    start_cue: Option<ChannelBinding>,
    return_cue: Option<ChannelBinding>,
    play_start_cue: bool,
    play_return_cue: bool,
    subscribers: Subscribers,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    /// Create a fresh session: stopped, Main active, every slot empty.
    pub fn new() -> Self {
        Self {
            version: 0,
            is_playing: false,
            current_step: 0,
            tempo: DEFAULT_TEMPO,
            master_volume: 1.0,
            active_role: Role::Main,
            editing_role: Role::Main,
            roles: Role::ALL.map(RoleState::new),
            role_queue: VecDeque::new(),
            pending_fill: None,
            pending_end: None,
            start_cue: None,
            return_cue: None,
            play_start_cue: false,
            play_return_cue: false,
            subscribers: Subscribers::default(),
        }
    }

    fn changed(&mut self, change: StateChange) {
        self.version += 1;
        self.subscribers.notify(change);
    }

    fn role(&self, role: Role) -> &RoleState {
        &self.roles[role.index()]
    }

    fn role_mut(&mut self, role: Role) -> &mut RoleState {
        &mut self.roles[role.index()]
    }

    /// Reset the step if it fell out of the active role's range.
    fn enforce_step_bound(&mut self) {
        if self.current_step >= self.active_step_count() {
            log::debug!(
                "[STATE] Step {} out of range for {} ({} steps), resetting",
                self.current_step,
                self.active_role,
                self.active_step_count()
            );
            self.current_step = 0;
            self.changed(StateChange::CurrentStep(0));
        }
    }

    /// Drop armed transitions whose entry step Main no longer has.
    fn drop_unreachable_pending(&mut self) {
        let steps = self.step_count(Role::Main);
        if self.pending_fill.is_some_and(|p| p.entry_step >= steps) {
            log::debug!("[STATE] Dropping fill armed past the end of main ({} steps)", steps);
            self.set_pending_fill(None);
        }
        if self.pending_end.is_some_and(|p| p.entry_step >= steps) {
            log::debug!("[STATE] Dropping end armed past the end of main ({} steps)", steps);
            self.set_pending_end(None);
        }
    }

    // === Notification ===

    /// Subscribe to one topic, or to everything with `None`.
    pub fn subscribe(&mut self, topic: Option<Topic>) -> Receiver<StateChange> {
        self.subscribers.subscribe(topic)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Monotonically increasing version, bumped by every change.
    pub fn version(&self) -> u64 {
        self.version
    }

    // === Transport ===

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            self.is_playing = playing;
            self.changed(StateChange::PlayState(playing));
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set the tempo, clamped to 40..=240 BPM.
    pub fn set_tempo(&mut self, bpm: f64) {
        let bpm = clamp_tempo(bpm);
        if (self.tempo - bpm).abs() > f64::EPSILON {
            self.tempo = bpm;
            self.changed(StateChange::Tempo(bpm));
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set the master volume, clamped to 0..=2.
    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 2.0) } else { 1.0 };
        if (self.master_volume - volume).abs() > f32::EPSILON {
            self.master_volume = volume;
            self.changed(StateChange::MasterVolume(volume));
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Move the playhead. Steps past the active role's end wrap around.
    pub fn set_current_step(&mut self, step: usize) {
        let step = step % self.active_step_count();
        if self.current_step != step {
            self.current_step = step;
            self.changed(StateChange::CurrentStep(step));
        }
    }

    pub fn reset_step(&mut self) {
        self.set_current_step(0);
    }

    /// Stop and return to a clean transport: step 0, Main active, empty
    /// queue and no armed transitions.
    pub fn reset_transport(&mut self) {
        self.set_playing(false);
        self.set_active_role(Role::Main);
        self.reset_step();
        self.queue_clear();
        self.set_pending_fill(None);
        self.set_pending_end(None);
    }

    // === Roles ===

    pub fn active_role(&self) -> Role {
        self.active_role
    }

    /// Switch the role driving playback.
    pub fn set_active_role(&mut self, role: Role) {
        if self.active_role != role {
            self.active_role = role;
            self.enforce_step_bound();
            self.changed(StateChange::ActiveRole(role));
        }
    }

    pub fn editing_role(&self) -> Role {
        self.editing_role
    }

    pub fn set_editing_role(&mut self, role: Role) {
        if self.editing_role != role {
            self.editing_role = role;
            self.changed(StateChange::EditingRole(role));
        }
    }

    // === Variations ===

    /// The live variation of a role.
    pub fn live(&self, role: Role) -> &Variation {
        &self.role(role).live
    }

    pub fn step_count(&self, role: Role) -> usize {
        self.live(role).step_count()
    }

    pub fn speed(&self, role: Role) -> f64 {
        self.live(role).speed()
    }

    pub fn active_step_count(&self) -> usize {
        self.step_count(self.active_role)
    }

    pub fn active_speed(&self) -> f64 {
        self.speed(self.active_role)
    }

    /// A saved slot, if it holds anything.
    pub fn slot(&self, role: Role, index: usize) -> Option<&Variation> {
        self.role(role).slots.get(index)?.as_ref()
    }

    /// Whether a slot holds a variation with at least one trigger.
    pub fn slot_has_content(&self, role: Role, index: usize) -> bool {
        self.slot(role, index).is_some_and(Variation::has_content)
    }

    pub fn current_variation(&self, role: Role) -> usize {
        self.role(role).current
    }

    /// Select a slot. Out-of-range indices are ignored.
    pub fn set_current_variation(&mut self, role: Role, index: usize) {
        if index >= role.slot_count() {
            return;
        }
        self.role_mut(role).current = index;
        self.changed(StateChange::Variation { role, index });
    }

    /// Copy a slot into the role's live variation.
    ///
    /// Returns false, changing nothing, when the slot was never saved.
    pub fn load_variation(&mut self, role: Role, index: usize) -> bool {
        let Some(variation) = self.slot(role, index).cloned() else {
            return false;
        };
        let steps = variation.step_count();
        self.role_mut(role).live = variation;
        self.changed(StateChange::Pattern { role });
        self.changed(StateChange::Volumes { role });
        self.changed(StateChange::Channels { role });
        self.changed(StateChange::StepCount { role, steps });
        if role == self.active_role {
            self.enforce_step_bound();
        }
        if role == Role::Main {
            self.drop_unreachable_pending();
        }
        true
    }

    /// Copy the role's live variation into a slot.
    pub fn save_variation(&mut self, role: Role, index: usize) {
        if index >= role.slot_count() {
            return;
        }
        let live = self.role(role).live.clone();
        self.role_mut(role).slots[index] = Some(live);
        self.changed(StateChange::Variation { role, index });
    }

    /// Put a variation straight into a slot, e.g. when a project is loaded.
    pub fn store_variation(&mut self, role: Role, index: usize, variation: Variation) {
        if index >= role.slot_count() {
            return;
        }
        self.role_mut(role).slots[index] = Some(variation);
        self.changed(StateChange::Variation { role, index });
    }

    /// Set the speed of a slot. The live variation follows when the slot is
    /// selected.
    pub fn set_variation_speed(&mut self, role: Role, index: usize, speed: f64) {
        if index >= role.slot_count() {
            return;
        }
        let state = self.role_mut(role);
        if let Some(slot) = state.slots[index].as_mut() {
            slot.set_speed(speed);
        }
        if state.current == index {
            state.live.set_speed(speed);
        }
        self.changed(StateChange::Variation { role, index });
    }

    // === Live edits ===

    /// Flip a trigger cell of a role's live variation.
    pub fn toggle_step(&mut self, role: Role, channel: usize, step: usize) {
        if self.role_mut(role).live.pattern_mut().toggle(channel, step) {
            self.changed(StateChange::Pattern { role });
        }
    }

    /// Set a trigger cell of a role's live variation.
    pub fn set_step(&mut self, role: Role, channel: usize, step: usize, on: bool) {
        if self.role_mut(role).live.pattern_mut().set(channel, step, on) {
            self.changed(StateChange::Pattern { role });
        }
    }

    /// Set a cell gain, clamped to 0..=1.
    pub fn set_step_volume(&mut self, role: Role, channel: usize, step: usize, gain: f32) {
        if self.role_mut(role).live.volumes_mut().set_gain(channel, step, gain) {
            self.changed(StateChange::Volumes { role });
        }
    }

    /// Resize a role's live variation.
    pub fn set_step_count(&mut self, role: Role, steps: usize) {
        self.role_mut(role).live.set_step_count(steps);
        let steps = self.step_count(role);
        self.changed(StateChange::StepCount { role, steps });
        if role == self.active_role {
            self.enforce_step_bound();
        }
        if role == Role::Main {
            self.drop_unreachable_pending();
        }
    }

    /// Bind or unbind a channel of a role's live variation.
    pub fn bind_channel(&mut self, role: Role, channel: usize, binding: Option<ChannelBinding>) {
        if self.role_mut(role).live.bind(channel, binding) {
            self.changed(StateChange::Channels { role });
        }
    }

    // === Queue ===

    pub fn queue(&self) -> &VecDeque<Role> {
        &self.role_queue
    }

    /// Queue a role to play after the current pattern completes.
    pub fn queue_push(&mut self, role: Role) {
        self.role_queue.push_back(role);
        let len = self.role_queue.len();
        self.changed(StateChange::Queue { len });
    }

    pub fn queue_shift(&mut self) -> Option<Role> {
        let role = self.role_queue.pop_front()?;
        let len = self.role_queue.len();
        self.changed(StateChange::Queue { len });
        Some(role)
    }

    pub fn queue_clear(&mut self) {
        if !self.role_queue.is_empty() {
            self.role_queue.clear();
            self.changed(StateChange::Queue { len: 0 });
        }
    }

    // === Pending transitions ===

    pub fn pending_fill(&self) -> Option<PendingTransition> {
        self.pending_fill
    }

    pub fn set_pending_fill(&mut self, pending: Option<PendingTransition>) {
        if self.pending_fill != pending {
            self.pending_fill = pending;
            self.changed(StateChange::PendingFill(pending));
        }
    }

    pub fn pending_end(&self) -> Option<PendingTransition> {
        self.pending_end
    }

    pub fn set_pending_end(&mut self, pending: Option<PendingTransition>) {
        if self.pending_end != pending {
            self.pending_end = pending;
            self.changed(StateChange::PendingEnd(pending));
        }
    }

    // === Cues ===

    pub fn cue_sound(&self, cue: Cue) -> Option<&ChannelBinding> {
        match cue {
            Cue::Start => self.start_cue.as_ref(),
            Cue::Return => self.return_cue.as_ref(),
        }
    }

    pub fn set_cue_sound(&mut self, cue: Cue, binding: Option<ChannelBinding>) {
        match cue {
            Cue::Start => self.start_cue = binding,
            Cue::Return => self.return_cue = binding,
        }
        self.changed(StateChange::Cues);
    }

    pub fn play_start_cue(&self) -> bool {
        self.play_start_cue
    }

    pub fn set_play_start_cue(&mut self, play: bool) {
        if self.play_start_cue != play {
            self.play_start_cue = play;
            self.changed(StateChange::Cues);
        }
    }

    pub fn play_return_cue(&self) -> bool {
        self.play_return_cue
    }

    pub fn set_play_return_cue(&mut self, play: bool) {
        if self.play_return_cue != play {
            self.play_return_cue = play;
            self.changed(StateChange::Cues);
        }
    }

    // === Triggers ===

    /// Everything due at `step` of the active role.
    ///
    /// Cues come first and only fire at step 0 when their flag is set and a
    /// sound is bound. Channel gains are the cell gain times the master
    /// volume.
    pub fn triggers_at(&self, step: usize) -> Vec<StepTrigger> {
        let mut triggers = Vec::new();

        if step == 0 {
            for (cue, enabled) in [(Cue::Start, self.play_start_cue), (Cue::Return, self.play_return_cue)] {
                if let (true, Some(binding)) = (enabled, self.cue_sound(cue)) {
                    triggers.push(StepTrigger {
                        source: TriggerSource::Cue(cue),
                        binding: Some(binding.clone()),
                        gain: self.master_volume,
                    });
                }
            }
        }

        let live = self.live(self.active_role);
        for channel in live.pattern().channels_at(step) {
            triggers.push(StepTrigger {
                source: TriggerSource::Channel(channel),
                binding: live.channel(channel).cloned(),
                gain: live.volumes().gain(channel, step) * self.master_volume,
            });
        }
        debug_assert!(triggers.len() <= MAX_CHANNELS + 2);

        triggers
    }
}
