//! Readiness wait
//!
//! The reactor's only suspension point. A poller blocks, with no timeout,
//! until at least one registered descriptor is ready for the interest it
//! was registered with.

use std::os::fd::BorrowedFd;

use streamux_core::Result;

/// What a caller wants to hear about for one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const READ: Interest = Interest { read: true, write: false };
    pub const WRITE: Interest = Interest { read: false, write: true };
    pub const BOTH: Interest = Interest { read: true, write: true };

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// What the poller reported for one descriptor.
///
/// Hang-up and error conditions count as ready for whichever interest was
/// registered, so the following read or write surfaces them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

impl Readiness {
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.readable || self.writable
    }
}

/// Platform readiness primitive
///
/// **Contract:**
/// - `wait()` blocks indefinitely until at least one source is ready.
/// - Signal interruptions are retried internally and never returned.
/// - An indefinite wait that returns with nothing ready is reported as
///   `Error::ReactorInvariantBroken`.
/// - The result has one entry per source, in the same order.
pub trait Poller {
    fn wait(&mut self, sources: &[(BorrowedFd<'_>, Interest)]) -> Result<Vec<Readiness>>;
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::PollPoller as PlatformPoller;
    } else {
        compile_error!("streamux needs poll(2); only unix targets are supported");
    }
}

/// Block until `fd` accepts writes.
pub fn wait_writable(fd: BorrowedFd<'_>) -> Result<()> {
    PlatformPoller::new().wait(&[(fd, Interest::WRITE)])?;
    Ok(())
}
