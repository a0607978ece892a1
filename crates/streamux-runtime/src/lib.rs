//! # streamux-runtime
//!
//! Platform-specific runtime for streamux.
//!
//! This crate provides:
//! - The raw duplex stream contract and descriptor checks (`nix::fcntl`)
//! - A readiness poller (`poll(2)` via `nix`)
//! - `FilteredChannel`, a transform relay with buffered output
//! - `Reactor`, the single-threaded dispatch loop over named channels
//! - Channel configuration with environment overrides

pub mod config;
pub mod stream;
pub mod poller;
pub mod channel;
pub mod registry;
pub mod handler;
pub mod reactor;

// Re-exports
pub use config::ChannelConfig;
pub use stream::DuplexStream;
pub use poller::{Interest, PlatformPoller, Poller, Readiness};
pub use channel::FilteredChannel;
pub use registry::{Registry, SlotId};
pub use handler::{Callback, Handler};
pub use reactor::Reactor;
