//! Step grids and the variations built from them.
//!
//! This module defines the data a role plays:
//!
//! - [`Pattern`] - On/off triggers, one row per channel
//! - [`VolumeGrid`] - Per-cell gains parallel to the pattern
//! - [`ChannelBinding`] - What a channel plays, as opaque identifiers
//! - [`Variation`] - Pattern, volumes, bindings, step count and speed

use crate::timing::clamp_speed;

/// Number of channels in every grid.
pub const MAX_CHANNELS: usize = 8;
/// Step count of a fresh variation.
pub const DEFAULT_STEP_COUNT: usize = 16;
/// Longest supported variation.
pub const MAX_STEP_COUNT: usize = 64;

/// Clamp a step count into `1..=MAX_STEP_COUNT`.
pub fn clamp_step_count(steps: usize) -> usize {
    steps.clamp(1, MAX_STEP_COUNT)
}

/// A `MAX_CHANNELS x steps` grid of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    rows: [Vec<T>; MAX_CHANNELS],
}

/// Boolean trigger grid.
pub type Pattern = Grid<bool>;
/// Gain grid parallel to a [`Pattern`].
pub type VolumeGrid = Grid<f32>;

impl<T: Copy> Grid<T> {
    /// Create a grid with every cell set to `value`.
    pub fn filled(steps: usize, value: T) -> Self {
        let steps = clamp_step_count(steps);
        Self {
            rows: std::array::from_fn(|_| vec![value; steps]),
        }
    }

    /// Number of steps per row.
    pub fn step_count(&self) -> usize {
        self.rows[0].len()
    }

    /// Read a cell. Out-of-range coordinates return `None`.
    pub fn get(&self, channel: usize, step: usize) -> Option<T> {
        self.rows.get(channel)?.get(step).copied()
    }

    /// Write a cell. Returns false when the coordinates are out of range.
    pub fn set(&mut self, channel: usize, step: usize, value: T) -> bool {
        match self.rows.get_mut(channel).and_then(|row| row.get_mut(step)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Change the step count, keeping existing cells and padding with `fill`.
    pub fn resize(&mut self, steps: usize, fill: T) {
        let steps = clamp_step_count(steps);
        for row in &mut self.rows {
            row.resize(steps, fill);
        }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::filled(DEFAULT_STEP_COUNT, false)
    }
}

impl Pattern {
    /// An all-off pattern.
    pub fn new(steps: usize) -> Self {
        Self::filled(steps, false)
    }

    /// Whether the cell at `channel`/`step` is on.
    pub fn is_on(&self, channel: usize, step: usize) -> bool {
        self.get(channel, step).unwrap_or(false)
    }

    /// Flip a cell. Returns false when the coordinates are out of range.
    pub fn toggle(&mut self, channel: usize, step: usize) -> bool {
        let current = self.is_on(channel, step);
        self.set(channel, step, !current)
    }

    /// Whether any cell is on.
    pub fn has_content(&self) -> bool {
        self.rows.iter().any(|row| row.iter().any(|&on| on))
    }

    /// Channels that trigger at `step`, in channel order.
    pub fn channels_at(&self, step: usize) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_CHANNELS).filter(move |&channel| self.is_on(channel, step))
    }
}

impl Default for VolumeGrid {
    fn default() -> Self {
        Self::filled(DEFAULT_STEP_COUNT, 1.0)
    }
}

impl VolumeGrid {
    /// A grid at full gain.
    pub fn new(steps: usize) -> Self {
        Self::filled(steps, 1.0)
    }

    /// Gain of a cell, 0 when out of range.
    pub fn gain(&self, channel: usize, step: usize) -> f32 {
        self.get(channel, step).unwrap_or(0.0)
    }

    /// Set a gain, clamped into `[0, 1]`.
    pub fn set_gain(&mut self, channel: usize, step: usize, gain: f32) -> bool {
        let gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 0.0 };
        self.set(channel, step, gain)
    }
}

/// What a channel plays.
///
/// Both fields are opaque to the engine and handed through to the audio
/// service, which owns loading and decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelBinding {
    /// Sample identifier (file name or buffer key).
    pub sample: String,
    /// Optional MIDI file driving the channel.
    pub midi_path: Option<String>,
}

impl ChannelBinding {
    /// Bind a plain sample.
    pub fn sample(name: impl Into<String>) -> Self {
        Self {
            sample: name.into(),
            midi_path: None,
        }
    }

    /// Attach a MIDI file.
    pub fn with_midi(mut self, path: impl Into<String>) -> Self {
        self.midi_path = Some(path.into());
        self
    }
}

/// One playable variation of a role.
#[derive(Clone, Debug, PartialEq)]
pub struct Variation {
    pattern: Pattern,
    volumes: VolumeGrid,
    channels: [Option<ChannelBinding>; MAX_CHANNELS],
    speed: f64,
}

impl Default for Variation {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_COUNT)
    }
}

impl Variation {
    /// An empty variation at normal speed.
    pub fn new(steps: usize) -> Self {
        Self {
            pattern: Pattern::new(steps),
            volumes: VolumeGrid::new(steps),
            channels: Default::default(),
            speed: 1.0,
        }
    }

    /// Turn a cell on.
    pub fn with_hit(mut self, channel: usize, step: usize) -> Self {
        self.pattern.set(channel, step, true);
        self
    }

    /// Turn on every `every`th cell of a channel, starting at `offset`.
    pub fn with_hits_every(mut self, channel: usize, every: usize, offset: usize) -> Self {
        if every == 0 {
            return self;
        }
        for step in (offset..self.step_count()).step_by(every) {
            self.pattern.set(channel, step, true);
        }
        self
    }

    /// Set a cell gain.
    pub fn with_gain(mut self, channel: usize, step: usize, gain: f32) -> Self {
        self.volumes.set_gain(channel, step, gain);
        self
    }

    /// Set the speed multiplier.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.set_speed(speed);
        self
    }

    /// Bind a channel.
    pub fn with_channel(mut self, channel: usize, binding: ChannelBinding) -> Self {
        self.bind(channel, Some(binding));
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn pattern_mut(&mut self) -> &mut Pattern {
        &mut self.pattern
    }

    pub fn volumes(&self) -> &VolumeGrid {
        &self.volumes
    }

    pub fn volumes_mut(&mut self) -> &mut VolumeGrid {
        &mut self.volumes
    }

    /// Binding of a channel, if any.
    pub fn channel(&self, channel: usize) -> Option<&ChannelBinding> {
        self.channels.get(channel)?.as_ref()
    }

    /// Bind or unbind a channel. Returns false when out of range.
    pub fn bind(&mut self, channel: usize, binding: Option<ChannelBinding>) -> bool {
        match self.channels.get_mut(channel) {
            Some(slot) => {
                *slot = binding;
                true
            }
            None => false,
        }
    }

    pub fn step_count(&self) -> usize {
        self.pattern.step_count()
    }

    /// Resize both grids, keeping existing cells.
    pub fn set_step_count(&mut self, steps: usize) {
        self.pattern.resize(steps, false);
        self.volumes.resize(steps, 1.0);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the speed multiplier, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
    }

    /// Whether any cell is on.
    pub fn has_content(&self) -> bool {
        self.pattern.has_content()
    }
}
