//! Raw duplex stream contract.
//!
//! Anything that reads, writes and exposes a file descriptor can back a
//! channel: sockets, pipes wrapped in a duplex type, read-write files.
//! Descriptor flags are read and changed through `nix::fcntl`.

use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::fcntl::{fcntl, FcntlArg, OFlag};

use streamux_core::{Error, Result};

/// A raw duplex byte stream owned by one channel.
pub trait DuplexStream: Read + Write + AsFd {}

impl<T: Read + Write + AsFd + ?Sized> DuplexStream for T {}

fn status_flags(fd: BorrowedFd<'_>) -> nix::Result<OFlag> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL).map(OFlag::from_bits_retain)
}

/// Check that `fd` is open and was opened for both reading and writing.
pub fn validate(fd: BorrowedFd<'_>) -> Result<()> {
    let flags = status_flags(fd)
        .map_err(|e| Error::InvalidStream(format!("fd {}: {}", fd.as_raw_fd(), e)))?;
    if flags & OFlag::O_ACCMODE != OFlag::O_RDWR {
        return Err(Error::InvalidStream(format!(
            "fd {} is not opened for reading and writing",
            fd.as_raw_fd()
        )));
    }
    Ok(())
}

/// Toggle `O_NONBLOCK` on `fd`.
pub fn set_nonblocking(fd: BorrowedFd<'_>, nonblocking: bool) -> Result<()> {
    let flags = status_flags(fd).map_err(std::io::Error::from)?;
    let mut new = flags;
    new.set(OFlag::O_NONBLOCK, nonblocking);
    if new != flags {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(new)).map_err(std::io::Error::from)?;
    }
    Ok(())
}

/// Whether `O_NONBLOCK` is set on `fd`.
pub fn is_nonblocking(fd: BorrowedFd<'_>) -> Result<bool> {
    let flags = status_flags(fd).map_err(std::io::Error::from)?;
    Ok(flags.contains(OFlag::O_NONBLOCK))
}
