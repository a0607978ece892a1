//! `poll(2)` backed poller.
//!
//! Level-triggered and stateless: the interest set is rebuilt by the
//! caller on every pass, which matches the reactor recomputing interest
//! from handler and buffer state each time round.

use std::os::fd::BorrowedFd;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::trace;

use streamux_core::{Error, Result};

use super::{Interest, Poller, Readiness};

#[derive(Debug, Default)]
pub struct PollPoller {
    /// Interrupted waits seen so far (diagnostics only).
    interrupts: u64,
}

impl PollPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }
}

fn flags_for(interest: Interest) -> PollFlags {
    let mut flags = PollFlags::empty();
    if interest.read {
        flags |= PollFlags::POLLIN;
    }
    if interest.write {
        flags |= PollFlags::POLLOUT;
    }
    flags
}

fn readiness_from(revents: PollFlags, interest: Interest) -> Readiness {
    let trouble = revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL);
    Readiness {
        readable: interest.read && (revents.contains(PollFlags::POLLIN) || trouble),
        writable: interest.write && (revents.contains(PollFlags::POLLOUT) || trouble),
    }
}

impl Poller for PollPoller {
    fn wait(&mut self, sources: &[(BorrowedFd<'_>, Interest)]) -> Result<Vec<Readiness>> {
        let mut fds: Vec<PollFd<'_>> = sources
            .iter()
            .map(|(fd, interest)| PollFd::new(*fd, flags_for(*interest)))
            .collect();

        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(0) => {
                    return Err(Error::ReactorInvariantBroken(
                        "indefinite poll returned with no ready descriptor",
                    ))
                }
                Ok(n) => {
                    trace!(ready = n, watched = fds.len(), "poll returned");
                    break;
                }
                Err(Errno::EINTR) => {
                    self.interrupts += 1;
                    trace!(interrupts = self.interrupts, "poll interrupted, retrying");
                }
                Err(errno) => return Err(Error::Io(errno.into())),
            }
        }

        let ready: Vec<Readiness> = fds
            .iter()
            .zip(sources)
            .map(|(fd, (_, interest))| {
                readiness_from(fd.revents().unwrap_or(PollFlags::empty()), *interest)
            })
            .collect();

        if !ready.iter().any(Readiness::is_ready) {
            return Err(Error::ReactorInvariantBroken(
                "poll reported events outside the registered interest",
            ));
        }
        Ok(ready)
    }
}
