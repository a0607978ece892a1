//! Library defaults, overridable through the environment.

/// Soft cap on transformed bytes waiting to be flushed per channel.
pub const MAX_PENDING_OUTPUT: usize = 64 * 1024;

/// Raw bytes pulled per `FilteredChannel::read_chunk()` call.
pub const READ_CHUNK: usize = 8 * 1024;

/// Largest raw read a single `FilteredChannel::read()` call allocates for,
/// unless `read_chunk` is configured higher.
pub const READ_CEILING: usize = 1024 * 1024;
