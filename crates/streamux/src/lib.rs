//! # streamux - readiness reactor over filtered duplex channels
//!
//! A single-threaded loop that multiplexes many named duplex byte streams
//! and calls back into user code when a stream has data or has ended.
//! Each stream is wrapped in a [`FilteredChannel`] carrying a read chain
//! and a write chain of byte-transform stages.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::os::unix::net::UnixStream;
//! use streamux::prelude::*;
//!
//! let (ours, theirs) = UnixStream::pair()?;
//! let mut reactor = Reactor::new();
//!
//! let mut channel = FilteredChannel::new(ours, ChannelConfig::default())?;
//! channel.push_write_stage(Box::new(Rot13))?;
//! channel.push_read_stage(Box::new(Rot13))?;
//!
//! let echo = Handler::custom(|_reactor, ch, _name| {
//!     let data = ch.read_chunk()?;
//!     ch.write(&data)?;
//!     Ok(())
//! });
//! reactor.register_channel("echo", channel, echo, Handler::Default)?;
//! reactor.run(0)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         User Code                           │
//! │         register(), handlers, write(), run()/run_once()     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Reactor                            │
//! │     snapshot interest → poll(2) → dispatch → flush          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │ Filtered  │      │ Filtered  │      │ Filtered  │
//!    │ Channel   │      │ Channel   │      │ Channel   │
//!    └───────────┘      └───────────┘      └───────────┘
//!          │  read chain (reversed) / write chain (in order)
//!          ▼
//!    ┌─────────────────────────────────────────────────────────┐
//!    │          raw duplex stream (socket, pipe, file)         │
//!    └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Logging
//!
//! Everything is instrumented with `tracing`. Call [`init_logging`] to get
//! a stderr formatter filtered by `STREAMUX_LOG`.

// Re-export core types
pub use streamux_core::{
    Error,
    Result,
    Chain,
    Direction,
    Transform,
};
pub use streamux_core::stage::{from_fn, FnStage};
pub use streamux_core::log::{init as init_logging, init_for_tests as init_test_logging};

// Re-export env utilities
pub use streamux_core::{env_get, env_get_bool, env_get_str};

// Re-export runtime types
pub use streamux_runtime::{
    ChannelConfig,
    DuplexStream,
    FilteredChannel,
    Handler,
    Callback,
    Reactor,
};
pub use streamux_runtime::config::defaults;

// Re-export default stages
pub use streamux_stages::{Base64Decode, Base64Encode, Rot13};

/// Everything a typical caller needs.
pub mod prelude {
    pub use crate::{
        Base64Decode,
        Base64Encode,
        ChannelConfig,
        Error,
        FilteredChannel,
        Handler,
        Reactor,
        Result,
        Rot13,
        Transform,
    };
}
