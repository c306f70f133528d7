//! The built-in demo groove.
//!
//! One intro, two main rhythms, two fills and an ending on an eight-piece
//! kit. Channel bindings are plain sample names; the wall-clock service only
//! logs them.

use groovebox_core::{ChannelBinding, Cue, Role, StateMessage, Variation};

const KICK: usize = 0;
const SNARE: usize = 1;
const HAT: usize = 2;
const OPEN_HAT: usize = 3;
const CLAP: usize = 4;
const TOM: usize = 5;
const CRASH: usize = 6;
const RIDE: usize = 7;

const KIT: [&str; 8] = [
    "kick.wav",
    "snare.wav",
    "hat.wav",
    "open-hat.wav",
    "clap.wav",
    "tom.wav",
    "crash.wav",
    "ride.wav",
];

/// Short label for a channel, used when printing the playhead.
pub fn channel_label(channel: usize) -> char {
    match channel {
        KICK => 'K',
        SNARE => 'S',
        HAT => 'h',
        OPEN_HAT => 'o',
        CLAP => 'c',
        TOM => 't',
        CRASH => 'C',
        RIDE => 'r',
        _ => '?',
    }
}

fn with_kit(mut variation: Variation) -> Variation {
    for (channel, sample) in KIT.iter().enumerate() {
        variation = variation.with_channel(channel, ChannelBinding::sample(*sample));
    }
    variation
}

fn intro() -> Variation {
    with_kit(
        Variation::new(8)
            .with_hit(KICK, 0)
            .with_hits_every(HAT, 2, 0)
            .with_hit(OPEN_HAT, 6),
    )
}

fn four_on_the_floor() -> Variation {
    let mut variation = Variation::new(16)
        .with_hits_every(KICK, 4, 0)
        .with_hit(SNARE, 4)
        .with_hit(SNARE, 12)
        .with_hits_every(HAT, 2, 0);
    for step in (2..16).step_by(4) {
        variation = variation.with_gain(HAT, step, 0.6);
    }
    with_kit(variation)
}

fn shuffle() -> Variation {
    with_kit(
        Variation::new(12)
            .with_hit(KICK, 0)
            .with_hit(KICK, 8)
            .with_hit(CLAP, 6)
            .with_hits_every(RIDE, 3, 0)
            .with_hits_every(HAT, 3, 2),
    )
}

fn snare_roll() -> Variation {
    let mut variation = Variation::new(16).with_hits_every(SNARE, 1, 0).with_speed(2.0);
    for step in 0..16 {
        variation = variation.with_gain(SNARE, step, 0.4 + step as f32 * 0.04);
    }
    with_kit(variation.with_hit(CRASH, 15))
}

fn tom_run() -> Variation {
    with_kit(
        Variation::new(8)
            .with_hits_every(TOM, 2, 0)
            .with_hits_every(SNARE, 2, 1)
            .with_hit(KICK, 0),
    )
}

fn ending() -> Variation {
    with_kit(
        Variation::new(8)
            .with_hit(KICK, 0)
            .with_hit(CRASH, 0)
            .with_hit(SNARE, 4)
            .with_hit(KICK, 6),
    )
}

/// Messages that load the demo into a fresh runtime.
pub fn setup_messages() -> Vec<StateMessage> {
    let slots = [
        (Role::Intro, 0, intro()),
        (Role::Main, 0, four_on_the_floor()),
        (Role::Main, 1, shuffle()),
        (Role::Fill, 0, snare_roll()),
        (Role::Fill, 1, tom_run()),
        (Role::End, 0, ending()),
    ];

    let mut messages: Vec<StateMessage> = slots
        .into_iter()
        .map(|(role, variation, data)| StateMessage::StoreVariation {
            role,
            variation,
            data: Box::new(data),
        })
        .collect();

    messages.push(StateMessage::SelectVariation {
        role: Role::Main,
        variation: 0,
    });
    for cue in [Cue::Start, Cue::Return] {
        messages.push(StateMessage::SetCueSound {
            cue,
            binding: Some(ChannelBinding::sample(KIT[CRASH])),
        });
    }
    messages
}
