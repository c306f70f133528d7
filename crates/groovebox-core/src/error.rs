//! Error types for groovebox-core

use thiserror::Error;

/// Result type alias for groovebox-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur at the edges of the playback engine.
///
/// The engine itself never fails: invalid transition requests and empty
/// slot loads are silently ignored. These variants cover configuration,
/// the runtime thread and the host audio service.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The runtime thread is gone
    #[error("Runtime channel closed")]
    ChannelClosed,

    /// The audio service could not be resumed
    #[error("Audio service error: {0}")]
    Audio(String),
}
