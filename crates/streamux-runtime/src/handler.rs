//! Read and close handlers.

use streamux_core::Result;

use crate::channel::FilteredChannel;
use crate::reactor::Reactor;

/// Callback invoked with the reactor, the channel and the channel's name.
///
/// The channel is checked out of the reactor while the callback runs, so
/// the callback may freely register, look up or remove other channels,
/// and may remove its own (it is closed once the callback returns).
pub type Callback = Box<dyn FnMut(&mut Reactor, &mut FilteredChannel, &str) -> Result<()>>;

/// A read or close handler.
///
/// - read: `Default` means no read interest; the channel only flushes.
/// - close: `Default` removes the channel and closes its raw stream.
///   A `Custom` close handler owns disposal and must call
///   `Reactor::remove` itself.
#[derive(Default)]
pub enum Handler {
    #[default]
    Default,
    Custom(Callback),
}

impl Handler {
    pub fn custom<F>(f: F) -> Self
    where
        F: FnMut(&mut Reactor, &mut FilteredChannel, &str) -> Result<()> + 'static,
    {
        Handler::Custom(Box::new(f))
    }

    #[inline]
    pub fn is_custom(&self) -> bool {
        matches!(self, Handler::Custom(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Default => f.write_str("Default"),
            Handler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
