//! State messages for Groovebox.
//!
//! Host requests are represented as [`StateMessage`] variants and sent to
//! the runtime thread, which applies them between scheduler ticks. This
//! keeps every mutation of the playback state on one thread.

use super::model::{Cue, Role};
use crate::pattern::{ChannelBinding, Variation};

/// Messages sent to the runtime to drive playback or edit patterns.
#[derive(Clone, Debug)]
pub enum StateMessage {
    // === Transport ===
    /// Start playback, through the intro when it has content.
    Play,

    /// Stop playback and reset the transport.
    Stop,

    /// Play when stopped, stop when playing.
    TogglePlay,

    /// Set the tempo in BPM.
    SetTempo { bpm: f64 },

    /// Set the master volume.
    SetMasterVolume { volume: f32 },

    // === Transitions ===
    /// Arm a specific fill slot.
    ArmFill { variation: usize },

    /// Arm the next fill slot with content, rotating across calls.
    PlayRotatingFill,

    /// Play a fill, then switch the main rhythm.
    ///
    /// Without a target the next main slot with content is used.
    FillToNextRhythm { target: Option<usize> },

    /// Arm the ending.
    ArmEnd,

    /// Switch the main rhythm immediately, keeping the cycle phase.
    ActivateRhythm { variation: usize },

    /// Queue a role to play after the current pattern completes.
    QueueRole { role: Role },

    /// Loop the active pattern without transitions.
    SetAudition { enabled: bool },

    // === Editing ===
    /// Choose the role being edited.
    SetEditingRole { role: Role },

    /// Select a slot and load it into the live variation.
    SelectVariation { role: Role, variation: usize },

    /// Save the live variation into a slot.
    SaveVariation { role: Role, variation: usize },

    /// Store a variation into a slot without touching the live one.
    StoreVariation {
        role: Role,
        variation: usize,
        data: Box<Variation>,
    },

    /// Flip a trigger cell.
    ToggleStep {
        role: Role,
        channel: usize,
        step: usize,
    },

    /// Set a trigger cell.
    SetStep {
        role: Role,
        channel: usize,
        step: usize,
        on: bool,
    },

    /// Set a cell gain.
    SetStepVolume {
        role: Role,
        channel: usize,
        step: usize,
        gain: f32,
    },

    /// Resize a role's live variation.
    SetStepCount { role: Role, steps: usize },

    /// Set the speed of a slot.
    SetVariationSpeed {
        role: Role,
        variation: usize,
        speed: f64,
    },

    /// Bind or unbind a channel.
    BindChannel {
        role: Role,
        channel: usize,
        binding: Option<ChannelBinding>,
    },

    /// Bind or unbind a cue sound.
    SetCueSound {
        cue: Cue,
        binding: Option<ChannelBinding>,
    },
}
