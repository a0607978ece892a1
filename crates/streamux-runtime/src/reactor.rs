//! # Reactor - single-threaded readiness loop over named channels
//!
//! One pass (`run_once`) does:
//! 1. Snapshot the registered channels and their interest:
//!    read if the read handler is custom, write if output is pending
//! 2. Block in the poller until something is ready
//! 3. Dispatch read/close handlers for read-ready channels, in
//!    registration order
//! 4. Flush channels that had pending output and were reported writable
//!
//! Handlers run synchronously with `&mut Reactor`, so they can register,
//! look up and remove channels. A channel whose handler is running is
//! checked out of the registry for the duration of the call.

use std::os::fd::{AsFd, BorrowedFd};

use tracing::{debug, trace, warn};

use streamux_core::{Error, Result};

use crate::channel::FilteredChannel;
use crate::config::ChannelConfig;
use crate::handler::Handler;
use crate::poller::{Interest, PlatformPoller, Poller, Readiness};
use crate::registry::{Registry, SlotId};
use crate::stream::DuplexStream;

struct Entry {
    channel: FilteredChannel,
    on_read: Handler,
    on_close: Handler,
}

/// One snapshot row of a pass.
struct Planned {
    id: SlotId,
    name: String,
    interest: Interest,
}

pub struct Reactor {
    channels: Registry<Entry>,
    poller: PlatformPoller,
    /// Used for channels created by `register()`.
    config: ChannelConfig,
    /// True while handlers of a pass are running.
    dispatching: bool,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// Reactor whose channels use `ChannelConfig::from_env()`.
    ///
    /// An invalid environment override is logged and the library defaults
    /// are used instead.
    pub fn new() -> Self {
        let config = ChannelConfig::from_env();
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "ignoring invalid channel configuration from environment");
                ChannelConfig::builtin()
            }
        };
        Self::build(config)
    }

    pub fn with_config(config: ChannelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ChannelConfig) -> Self {
        Self {
            channels: Registry::new(),
            poller: PlatformPoller::new(),
            config,
            dispatching: false,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Registration and lookup
    // ------------------------------------------------------------------

    /// Wrap `stream` in a new channel and register it under `name`.
    ///
    /// Fails with `InvalidArgument` for an empty name, `DuplicateName` if
    /// the name is taken, `InvalidStream` if the stream is closed or not
    /// open for both reading and writing. Nothing is registered on failure.
    pub fn register<S>(
        &mut self,
        name: &str,
        stream: S,
        on_read: Handler,
        on_close: Handler,
    ) -> Result<()>
    where
        S: DuplexStream + 'static,
    {
        self.channels.check_name(name)?;
        let channel = FilteredChannel::new(stream, self.config.clone())?;
        self.register_channel(name, channel, on_read, on_close)
    }

    /// Register a channel built by the caller, chains and all.
    pub fn register_channel(
        &mut self,
        name: &str,
        channel: FilteredChannel,
        on_read: Handler,
        on_close: Handler,
    ) -> Result<()> {
        let read = on_read.is_custom();
        let close = on_close.is_custom();
        self.channels.insert(
            name,
            Entry {
                channel,
                on_read,
                on_close,
            },
        )?;
        debug!(channel = name, custom_read = read, custom_close = close, "channel registered");
        Ok(())
    }

    /// The channel registered as `name`.
    ///
    /// `None` if unknown, or while the channel's own handler is running.
    pub fn get(&self, name: &str) -> Option<&FilteredChannel> {
        self.channels.get(name).map(|e| &e.channel)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FilteredChannel> {
        self.channels.get_mut(name).map(|e| &mut e.channel)
    }

    /// Unregister `name` and close its raw stream.
    ///
    /// Removing a channel from inside its own handler is allowed; it is
    /// closed when the handler returns.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        match self.channels.remove(name)? {
            Some(entry) => {
                debug!(channel = name, "channel removed");
                drop(entry);
            }
            None => debug!(channel = name, "channel removed by its own handler"),
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.channels.names().map(str::to_string).collect()
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    /// Run passes until idle (`max_iterations == 0`) or for at most
    /// `max_iterations` passes. Returns the number of passes that ran.
    pub fn run(&mut self, max_iterations: usize) -> Result<usize> {
        let mut passes = 0;
        while max_iterations == 0 || passes < max_iterations {
            if !self.run_once()? {
                break;
            }
            passes += 1;
        }
        debug!(passes, "reactor loop finished");
        Ok(passes)
    }

    /// One pass. Returns `Ok(false)` without blocking when no channel has
    /// read or write interest.
    pub fn run_once(&mut self) -> Result<bool> {
        if self.dispatching {
            return Err(Error::Reentrant);
        }

        let mut plan = Vec::with_capacity(self.channels.len());
        let readiness = {
            let mut sources: Vec<(BorrowedFd<'_>, Interest)> = Vec::with_capacity(plan.capacity());
            for (id, name, entry) in self.channels.iter() {
                let interest = Interest {
                    read: entry.on_read.is_custom(),
                    write: entry.channel.pending_output_len() > 0,
                };
                if interest.is_empty() {
                    continue;
                }
                plan.push(Planned {
                    id,
                    name: name.to_string(),
                    interest,
                });
                sources.push((entry.channel.as_fd(), interest));
            }

            if sources.is_empty() {
                trace!("no channel has interest, reactor idle");
                return Ok(false);
            }
            self.poller.wait(&sources)?
        };
        trace!(watched = plan.len(), "pass started");

        self.dispatching = true;
        let dispatched = self.dispatch_readable(&plan, &readiness);
        self.dispatching = false;
        dispatched?;

        self.flush_writable(&plan, &readiness)?;
        Ok(true)
    }

    fn dispatch_readable(&mut self, plan: &[Planned], readiness: &[Readiness]) -> Result<()> {
        for (row, ready) in plan.iter().zip(readiness) {
            if ready.readable {
                self.dispatch(row.id, &row.name)?;
            }
        }
        Ok(())
    }

    fn flush_writable(&mut self, plan: &[Planned], readiness: &[Readiness]) -> Result<()> {
        for (row, ready) in plan.iter().zip(readiness) {
            if !(row.interest.write && ready.writable) {
                continue;
            }
            // gone if a handler removed it earlier in this pass
            if let Some(entry) = self.channels.get_by_id_mut(row.id) {
                let n = entry.channel.flush()?;
                trace!(
                    channel = row.name.as_str(),
                    flushed = n,
                    pending = entry.channel.pending_output_len(),
                    "flushed"
                );
            }
        }
        Ok(())
    }

    /// Check the channel out, run its handlers, check it back in.
    fn dispatch(&mut self, id: SlotId, name: &str) -> Result<()> {
        let Some(mut entry) = self.channels.checkout(id) else {
            trace!(channel = name, "removed earlier in this pass, skipped");
            return Ok(());
        };

        let result = self.run_handlers(id, name, &mut entry);

        if let Some(closed) = self.channels.checkin(id, entry) {
            debug!(channel = name, "channel closed");
            drop(closed);
        }
        result
    }

    fn run_handlers(&mut self, id: SlotId, name: &str, entry: &mut Entry) -> Result<()> {
        let mut closing = entry.channel.is_eof();
        if !closing {
            if let Handler::Custom(on_read) = &mut entry.on_read {
                match on_read(self, &mut entry.channel, name) {
                    Ok(()) => {}
                    Err(Error::EndOfStream) => closing = true,
                    Err(e) => return Err(e),
                }
            }
            closing |= entry.channel.is_eof();
        }

        // nothing left to close if the read handler removed the channel
        if !closing || !self.channels.contains_id(id) {
            return Ok(());
        }

        match &mut entry.on_close {
            Handler::Custom(on_close) => {
                debug!(channel = name, "end of stream, running close handler");
                match on_close(self, &mut entry.channel, name) {
                    Ok(()) | Err(Error::EndOfStream) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            Handler::Default => {
                debug!(channel = name, "end of stream, removing channel");
                // checked out, so the entry comes back from checkin and drops there
                let _ = self.channels.remove_id(id);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("channels", &self.names())
            .field("config", &self.config)
            .field("dispatching", &self.dispatching)
            .finish()
    }
}
