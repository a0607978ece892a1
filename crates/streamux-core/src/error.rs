//! Error types for streamux

use std::io;

/// Result type for channel and reactor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering, transforming or dispatching
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad argument (empty channel name, invalid configuration, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A channel with this name is already registered
    #[error("duplicate channel name: {0}")]
    DuplicateName(String),

    /// The raw stream is closed or not opened for both reading and writing
    #[error("invalid stream: {0}")]
    InvalidStream(String),

    /// No channel registered under this name
    #[error("unknown channel: {0}")]
    NotFound(String),

    /// Transform chain mutated after the channel performed I/O
    #[error("transform chain is sealed after first use")]
    ChainSealed,

    /// A transform stage rejected its input
    #[error("transform stage `{stage}` failed: {reason}")]
    Transform {
        /// Stage name.
        stage: String,
        /// What went wrong.
        reason: String,
    },

    /// The loop was entered from inside one of its own callbacks
    #[error("reactor loop re-entered from a callback")]
    Reentrant,

    /// The readiness substrate broke its contract. Unrecoverable.
    #[error("reactor invariant broken: {0}")]
    ReactorInvariantBroken(&'static str),

    /// Read, write or flush failure on a raw stream
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// The channel reached end-of-stream.
    ///
    /// A control signal, not a failure: a read callback returns it to ask
    /// the reactor for close handling.
    #[error("end of stream")]
    EndOfStream,
}

impl Error {
    /// Build a `Transform` error for the named stage.
    pub fn transform(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Transform {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// True for the end-of-stream control signal.
    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// True when the error is unrecoverable for the loop.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ReactorInvariantBroken(_))
    }
}
