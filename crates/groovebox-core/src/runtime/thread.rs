//! Runtime thread for Groovebox.
//!
//! The runtime thread is where playback happens. It:
//! - Owns the [`Sequencer`] and its audio service
//! - Applies [`StateMessage`]s sent by the host
//! - Ticks the lookahead scheduler while playing
//! - Forwards [`EngineEvent`]s to the host

use crate::audio::AudioTriggerService;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::EngineEvent;
use crate::sequencer::Sequencer;
use crate::state::{PlaybackState, StateManager, StateMessage};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Handle to the running runtime.
///
/// This is the host's interface to playback. It provides thread-safe
/// access to state and message sending.
#[derive(Clone)]
pub struct RuntimeHandle {
    /// Sender for state messages.
    message_tx: Sender<StateMessage>,
    /// Shared state manager for read access.
    state_manager: StateManager,
    /// Receiver for engine events.
    event_rx: Receiver<EngineEvent>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
}

impl RuntimeHandle {
    /// Send a message to the runtime thread.
    pub fn send(&self, msg: StateMessage) -> Result<()> {
        self.message_tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// Get the state manager for read access.
    pub fn state(&self) -> &StateManager {
        &self.state_manager
    }

    /// Read the current state with a closure.
    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PlaybackState) -> R,
    {
        self.state_manager.with_state_read(f)
    }

    /// Get a clone of the message sender.
    pub fn message_sender(&self) -> Sender<StateMessage> {
        self.message_tx.clone()
    }

    /// Engine events, in the order they happened.
    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.event_rx
    }

    /// Take the next engine event without blocking.
    pub fn try_recv_event(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Signal the runtime to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Wait until an ending completes.
    ///
    /// Other events received meanwhile are discarded. Returns false on
    /// timeout or when the runtime is gone.
    pub fn wait_for_stop(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let result = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return false;
                    }
                    self.event_rx.recv_timeout(d - now)
                }
                None => self
                    .event_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match result {
                Ok(EngineEvent::Stopped) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("state", &self.state_manager)
            .field("shutdown", &self.is_shutdown_requested())
            .finish_non_exhaustive()
    }
}

/// A sequencer running on its own thread.
pub struct Runtime {
    handle: RuntimeHandle,
    thread_handle: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Start a runtime with default configuration.
    pub fn start_default<A>(audio: A) -> Result<Self>
    where
        A: AudioTriggerService + Send + 'static,
    {
        Self::start(audio, &EngineConfig::default())
    }

    /// Start a runtime thread driving `audio`.
    ///
    /// Playback does not start until [`StateMessage::Play`] is sent.
    pub fn start<A>(audio: A, config: &EngineConfig) -> Result<Self>
    where
        A: AudioTriggerService + Send + 'static,
    {
        let mut sequencer = Sequencer::with_config(audio, config);
        let state_manager = sequencer.state().clone();
        let tick_interval = sequencer.settings().tick_interval;

        let (message_tx, message_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        sequencer.set_event_sender(event_tx);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = RuntimeHandle {
            message_tx,
            state_manager,
            event_rx,
            shutdown: shutdown.clone(),
        };

        log::info!("[RUNTIME] Starting runtime thread (tick every {:?})", tick_interval);
        let thread_shutdown = shutdown.clone();
        let thread_handle = thread::Builder::new()
            .name("groovebox-runtime".to_string())
            .spawn(move || {
                let mut rt = RuntimeThread {
                    sequencer,
                    message_rx,
                    tick_interval,
                };
                rt.run(thread_shutdown);
            })?;

        Ok(Self {
            handle,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get a handle to interact with the runtime.
    pub fn handle(&self) -> &RuntimeHandle {
        &self.handle
    }

    /// Shut down the runtime gracefully.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.handle.shutdown();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[RUNTIME] Runtime thread panicked");
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.join();
    }
}

/// The runtime thread that processes messages and runs the scheduler.
struct RuntimeThread<A: AudioTriggerService> {
    sequencer: Sequencer<A>,
    message_rx: Receiver<StateMessage>,
    tick_interval: Duration,
}

impl<A: AudioTriggerService> RuntimeThread<A> {
    fn run(&mut self, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            if !self.drain_messages() {
                break;
            }

            if self.sequencer.is_armed() {
                self.sequencer.tick();
                thread::sleep(self.tick_interval);
            } else {
                // Idle: block on the next request instead of spinning
                match self.message_rx.recv_timeout(self.tick_interval) {
                    Ok(msg) => self.handle_message(msg),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        self.sequencer.stop();
        log::info!("[RUNTIME] Runtime thread exiting");
    }

    /// Apply all pending messages. Returns false once every sender is gone.
    fn drain_messages(&mut self) -> bool {
        loop {
            match self.message_rx.try_recv() {
                Ok(msg) => self.handle_message(msg),
                Err(crossbeam_channel::TryRecvError::Empty) => return true,
                Err(crossbeam_channel::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_message(&mut self, msg: StateMessage) {
        log::trace!("[RUNTIME] {:?}", msg);
        if let Err(e) = self.sequencer.apply(msg) {
            log::error!("[RUNTIME] {}", e);
        }
    }
}
