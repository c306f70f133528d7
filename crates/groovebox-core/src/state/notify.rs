//! Change notification for the playback state.
//!
//! Every mutation of [`PlaybackState`](super::PlaybackState) publishes a
//! [`StateChange`] after it has been applied. Listeners receive them on
//! crossbeam channels, filtered by [`Topic`] or unfiltered.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::model::{PendingTransition, Role};

/// Notification topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    PlayState,
    Tempo,
    MasterVolume,
    CurrentStep,
    ActiveRole,
    EditingRole,
    Pattern,
    Volumes,
    Channels,
    StepCount,
    Variation,
    Queue,
    PendingFill,
    PendingEnd,
    Cues,
}

/// A change that has just been applied to the playback state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateChange {
    // === Transport ===
    /// Transport started or stopped.
    PlayState(bool),
    /// Tempo changed (already clamped).
    Tempo(f64),
    /// Master volume changed (already clamped).
    MasterVolume(f32),
    /// Playback position moved.
    CurrentStep(usize),

    // === Roles ===
    /// The role driving playback changed.
    ActiveRole(Role),
    /// The role being edited changed.
    EditingRole(Role),

    // === Live variation edits ===
    /// A trigger cell or the whole pattern of a role changed.
    Pattern { role: Role },
    /// A gain cell of a role changed.
    Volumes { role: Role },
    /// A channel binding of a role changed.
    Channels { role: Role },
    /// The step count of a role changed.
    StepCount { role: Role, steps: usize },

    // === Slots ===
    /// Selection, slot contents or speed of a role's variations changed.
    Variation { role: Role, index: usize },

    // === Transitions ===
    /// The role queue changed; carries the new length.
    Queue { len: usize },
    /// A fill was armed or consumed.
    PendingFill(Option<PendingTransition>),
    /// An end was armed or consumed.
    PendingEnd(Option<PendingTransition>),
    /// Cue bindings or flags changed.
    Cues,
}

impl StateChange {
    /// The topic this change is published under.
    pub fn topic(&self) -> Topic {
        match self {
            StateChange::PlayState(_) => Topic::PlayState,
            StateChange::Tempo(_) => Topic::Tempo,
            StateChange::MasterVolume(_) => Topic::MasterVolume,
            StateChange::CurrentStep(_) => Topic::CurrentStep,
            StateChange::ActiveRole(_) => Topic::ActiveRole,
            StateChange::EditingRole(_) => Topic::EditingRole,
            StateChange::Pattern { .. } => Topic::Pattern,
            StateChange::Volumes { .. } => Topic::Volumes,
            StateChange::Channels { .. } => Topic::Channels,
            StateChange::StepCount { .. } => Topic::StepCount,
            StateChange::Variation { .. } => Topic::Variation,
            StateChange::Queue { .. } => Topic::Queue,
            StateChange::PendingFill(_) => Topic::PendingFill,
            StateChange::PendingEnd(_) => Topic::PendingEnd,
            StateChange::Cues => Topic::Cues,
        }
    }
}

/// Registered listeners.
///
/// Cloning yields an empty set: snapshots of the state do not notify
/// anyone.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Vec<(Option<Topic>, Sender<StateChange>)>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, topic: Option<Topic>) -> Receiver<StateChange> {
        let (tx, rx) = unbounded();
        self.entries.push((topic, tx));
        rx
    }

    /// Deliver a change, dropping listeners whose receiver is gone.
    pub(crate) fn notify(&mut self, change: StateChange) {
        if self.entries.is_empty() {
            return;
        }
        let topic = change.topic();
        self.entries.retain(|(filter, tx)| match filter {
            Some(wanted) if *wanted != topic => true,
            _ => tx.send(change).is_ok(),
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Clone for Subscribers {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_filtering() {
        let mut subscribers = Subscribers::default();
        let tempo_rx = subscribers.subscribe(Some(Topic::Tempo));
        let all_rx = subscribers.subscribe(None);

        subscribers.notify(StateChange::CurrentStep(3));
        subscribers.notify(StateChange::Tempo(120.0));

        assert_eq!(tempo_rx.try_iter().collect::<Vec<_>>(), vec![StateChange::Tempo(120.0)]);
        assert_eq!(
            all_rx.try_iter().collect::<Vec<_>>(),
            vec![StateChange::CurrentStep(3), StateChange::Tempo(120.0)]
        );
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut subscribers = Subscribers::default();
        let rx = subscribers.subscribe(None);
        let filtered = subscribers.subscribe(Some(Topic::Queue));
        assert_eq!(subscribers.len(), 2);

        drop(rx);
        drop(filtered);
        subscribers.notify(StateChange::Cues);
        // The filtered listener is only pruned once a change for its topic is sent
        assert_eq!(subscribers.len(), 1);
        subscribers.notify(StateChange::Queue { len: 0 });
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn test_clone_is_empty() {
        let mut subscribers = Subscribers::default();
        let _rx = subscribers.subscribe(None);
        assert_eq!(subscribers.clone().len(), 0);
    }

    #[test]
    fn test_change_topics() {
        assert_eq!(StateChange::PendingFill(None).topic(), Topic::PendingFill);
        assert_eq!(
            StateChange::StepCount { role: Role::Fill, steps: 8 }.topic(),
            Topic::StepCount
        );
        assert_eq!(StateChange::ActiveRole(Role::End).topic(), Topic::ActiveRole);
    }
}
