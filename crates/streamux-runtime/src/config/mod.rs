//! Channel configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder setters (programmatic)
//! 2. Environment variables (runtime)
//! 3. Library defaults (`config::defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use streamux_runtime::config::ChannelConfig;
//!
//! let config = ChannelConfig::from_env()
//!     .max_pending_output(16 * 1024)
//!     .read_chunk(512);
//! config.validate()?;
//! ```

pub mod defaults;

use streamux_core::env::env_get;
use streamux_core::{Error, Result};

/// Per-channel buffering configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Writes are refused (short count) once this many transformed bytes
    /// are waiting to be flushed
    pub max_pending_output: usize,
    /// Raw bytes pulled by `read_chunk()`
    pub read_chunk: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ChannelConfig {
    /// Library defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            max_pending_output: defaults::MAX_PENDING_OUTPUT,
            read_chunk: defaults::READ_CHUNK,
        }
    }

    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `STREAMUX_MAX_PENDING_OUTPUT` - pending output cap in bytes
    /// - `STREAMUX_READ_CHUNK` - raw bytes per `read_chunk()`
    pub fn from_env() -> Self {
        Self {
            max_pending_output: env_get(
                "STREAMUX_MAX_PENDING_OUTPUT",
                defaults::MAX_PENDING_OUTPUT,
            ),
            read_chunk: env_get("STREAMUX_READ_CHUNK", defaults::READ_CHUNK),
        }
    }

    /// Set the pending output cap
    pub fn max_pending_output(mut self, bytes: usize) -> Self {
        self.max_pending_output = bytes;
        self
    }

    /// Set the `read_chunk()` size
    pub fn read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_pending_output == 0 {
            return Err(Error::InvalidArgument(
                "max_pending_output must be at least 1".into(),
            ));
        }
        if self.read_chunk == 0 {
            return Err(Error::InvalidArgument("read_chunk must be at least 1".into()));
        }
        Ok(())
    }
}
