//! State manager for thread-safe state access.
//!
//! The [`StateManager`] provides synchronized access to the central
//! [`PlaybackState`]. It uses an RwLock to allow multiple readers or
//! a single writer.

use std::sync::{Arc, RwLock};

use crossbeam_channel::Receiver;

use super::model::{PlaybackState, Role};
use super::notify::{StateChange, Topic};

/// Thread-safe manager for the playback state.
///
/// The StateManager wraps the PlaybackState in an Arc<RwLock> so the
/// runtime thread can write while hosts read from anywhere.
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<PlaybackState>>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Create a new state manager with a fresh session.
    pub fn new() -> Self {
        Self::with_state(PlaybackState::new())
    }

    /// Create a state manager with a specific initial state.
    pub fn with_state(state: PlaybackState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Read the state with a closure.
    ///
    /// This acquires a read lock for the duration of the closure.
    /// Multiple readers can hold the lock simultaneously.
    pub fn with_state_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PlaybackState) -> R,
    {
        let state = self.state.read().expect("State lock poisoned");
        f(&state)
    }

    /// Write to the state with a closure.
    ///
    /// This acquires an exclusive write lock for the duration of the closure.
    pub fn with_state_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PlaybackState) -> R,
    {
        let mut state = self.state.write().expect("State lock poisoned");
        f(&mut state)
    }

    /// Get a clone of the current state.
    ///
    /// The snapshot carries no subscribers.
    pub fn snapshot(&self) -> PlaybackState {
        self.with_state_read(|s| s.clone())
    }

    /// Subscribe to changes of one topic, or all of them with `None`.
    pub fn subscribe(&self, topic: Option<Topic>) -> Receiver<StateChange> {
        self.with_state_write(|s| s.subscribe(topic))
    }

    /// Get the current tempo.
    pub fn tempo(&self) -> f64 {
        self.with_state_read(|s| s.tempo())
    }

    /// Check if the transport is running.
    pub fn is_playing(&self) -> bool {
        self.with_state_read(|s| s.is_playing())
    }

    /// Get the playhead position.
    pub fn current_step(&self) -> usize {
        self.with_state_read(|s| s.current_step())
    }

    /// Get the role driving playback.
    pub fn active_role(&self) -> Role {
        self.with_state_read(|s| s.active_role())
    }

    /// Get the state version.
    pub fn version(&self) -> u64 {
        self.with_state_read(|s| s.version())
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
