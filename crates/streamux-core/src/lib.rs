//! # streamux-core
//!
//! Core types and traits for streamux.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! The reactor, poller and channels live in `streamux-runtime`.
//!
//! ## Modules
//!
//! - `error` - Error taxonomy and `Result` alias
//! - `stage` - Transform stage contract and per-direction chains
//! - `env` - Environment variable utilities
//! - `log` - `tracing` subscriber setup

pub mod error;
pub mod stage;
pub mod env;
pub mod log;

// Re-exports for convenience
pub use error::{Error, Result};
pub use stage::{Chain, Direction, Transform};
pub use env::{env_get, env_get_bool, env_get_str};
