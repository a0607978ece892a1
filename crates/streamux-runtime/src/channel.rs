//! # FilteredChannel - transform relay over one raw stream
//!
//! Wraps a raw duplex stream with a read chain and a write chain:
//!
//! 1. `read()` pulls raw bytes and runs them through the read chain
//! 2. `write()` runs caller bytes through the write chain and parks the
//!    result in the pending output buffer, never touching the stream
//! 3. `flush()` moves pending output to the stream, as far as it will take it
//!
//! The pending output length is the readiness hint the reactor polls for
//! write interest, so the reactor never has to run a transform itself.
//! Stages may hold bytes back (block encodings), which is why writes are
//! decoupled from the raw stream in the first place.

use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

use tracing::{debug, warn};

use streamux_core::{Chain, Direction, Error, Result, Transform};

use crate::config::{defaults, ChannelConfig};
use crate::poller;
use crate::stream::{self, DuplexStream};

pub struct FilteredChannel {
    raw: Box<dyn DuplexStream>,
    read_chain: Chain,
    write_chain: Chain,
    /// Transformed bytes not yet accepted by the raw stream.
    pending: Vec<u8>,
    config: ChannelConfig,
    /// Set by the first read or write; chains are frozen from then on.
    sealed: bool,
    eof: bool,
    write_finished: bool,
}

impl FilteredChannel {
    /// Wrap `raw`, which must be open for both reading and writing.
    ///
    /// The raw stream is switched to non-blocking mode, so `flush()` and
    /// `read()` never park the calling thread. The flag lives on the open
    /// file description and is therefore shared with any clone of `raw`.
    pub fn new<S>(raw: S, config: ChannelConfig) -> Result<Self>
    where
        S: DuplexStream + 'static,
    {
        Self::from_boxed(Box::new(raw), config)
    }

    pub fn from_boxed(raw: Box<dyn DuplexStream>, config: ChannelConfig) -> Result<Self> {
        config.validate()?;
        stream::validate(raw.as_fd())?;
        stream::set_nonblocking(raw.as_fd(), true)?;
        Ok(Self {
            raw,
            read_chain: Chain::new(Direction::Read),
            write_chain: Chain::new(Direction::Write),
            pending: Vec::new(),
            config,
            sealed: false,
            eof: false,
            write_finished: false,
        })
    }

    /// Append a read-direction stage. Fails once the channel has done I/O.
    pub fn push_read_stage(&mut self, stage: Box<dyn Transform>) -> Result<()> {
        if self.sealed {
            return Err(Error::ChainSealed);
        }
        self.read_chain.push(stage);
        Ok(())
    }

    /// Append a write-direction stage. Fails once the channel has done I/O.
    pub fn push_write_stage(&mut self, stage: Box<dyn Transform>) -> Result<()> {
        if self.sealed {
            return Err(Error::ChainSealed);
        }
        self.write_chain.push(stage);
        Ok(())
    }

    /// Read at most `max` raw bytes and return them transformed.
    ///
    /// - nothing available on a non-blocking stream: empty vec
    /// - end of stream: the read chain's tail if it had one, otherwise
    ///   `Err(EndOfStream)`; every later call returns `EndOfStream`
    ///
    /// The returned length follows the chain, not `max`; a single call
    /// pulls at most `max(read_chunk, READ_CEILING)` raw bytes.
    pub fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        self.sealed = true;
        if self.eof {
            return Err(Error::EndOfStream);
        }
        if max == 0 {
            return Ok(Vec::new());
        }

        let ceiling = self.config.read_chunk.max(defaults::READ_CEILING);
        let mut buf = vec![0u8; max.min(ceiling)];
        let n = loop {
            match self.raw.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 {
            self.eof = true;
            let tail = self.read_chain.finish()?;
            debug!(tail = tail.len(), "raw stream reached end of stream");
            if tail.is_empty() {
                return Err(Error::EndOfStream);
            }
            return Ok(tail);
        }

        self.read_chain.apply(&buf[..n])
    }

    /// `read()` with the configured chunk size.
    pub fn read_chunk(&mut self) -> Result<Vec<u8>> {
        self.read(self.config.read_chunk)
    }

    /// Transform `data` into the pending output buffer.
    ///
    /// Returns how many input bytes were accepted. Once pending output
    /// reaches `max_pending_output` the count comes up short (possibly 0);
    /// retry the rest after a flush.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.sealed = true;
        if self.write_finished {
            let e = io::Error::new(io::ErrorKind::BrokenPipe, "write side already finished");
            return Err(e.into());
        }

        let room = self.config.max_pending_output.saturating_sub(self.pending.len());
        let accepted = data.len().min(room);
        if accepted == 0 {
            return Ok(0);
        }

        let out = self.write_chain.apply(&data[..accepted])?;
        self.pending.extend_from_slice(&out);
        Ok(accepted)
    }

    /// Move as much pending output as the raw stream takes right now.
    ///
    /// Returns the number of bytes written. A stream that would block is
    /// not an error; the rest stays pending.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        let mut failure = None;
        while written < self.pending.len() {
            match self.raw.write(&self.pending[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.pending.drain(..written);

        if let Some(e) = failure {
            return Err(e.into());
        }
        if written > 0 {
            match self.raw.flush() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(written)
    }

    /// Flush until nothing is pending, waiting for writability in between.
    pub fn drain(&mut self) -> Result<()> {
        let mut stalled = false;
        while !self.pending.is_empty() {
            if self.flush()? > 0 {
                stalled = false;
                continue;
            }
            if stalled {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            poller::wait_writable(self.raw.as_fd())?;
            stalled = true;
        }
        Ok(())
    }

    /// End the write side: emit the write chain's tail, then drain.
    ///
    /// Further writes fail. Calling it again only drains.
    pub fn finish(&mut self) -> Result<()> {
        self.sealed = true;
        if !self.write_finished {
            let tail = self.write_chain.finish()?;
            self.pending.extend_from_slice(&tail);
            self.write_finished = true;
        }
        self.drain()
    }

    /// Transformed bytes waiting to be flushed.
    #[inline]
    pub fn pending_output_len(&self) -> usize {
        self.pending.len()
    }

    /// True once a read hit the end of the raw stream.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// True once the chains can no longer be changed.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn read_chain(&self) -> &Chain {
        &self.read_chain
    }

    pub fn write_chain(&self) -> &Chain {
        &self.write_chain
    }

    /// Toggle `O_NONBLOCK` on the raw stream.
    ///
    /// Channels start non-blocking. Switching back makes `flush()` wait
    /// for the peer, which stalls a reactor pass.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        stream::set_nonblocking(self.raw.as_fd(), nonblocking)
    }

    /// The raw stream, bypassing both chains.
    pub fn get_ref(&self) -> &dyn DuplexStream {
        &*self.raw
    }
}

impl AsFd for FilteredChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.raw.as_fd()
    }
}

impl std::fmt::Debug for FilteredChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredChannel")
            .field("read_chain", &self.read_chain)
            .field("write_chain", &self.write_chain)
            .field("pending", &self.pending.len())
            .field("sealed", &self.sealed)
            .field("eof", &self.eof)
            .finish()
    }
}

impl Drop for FilteredChannel {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(bytes = self.pending.len(), "closing channel with unflushed output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};
    use std::os::unix::net::UnixStream;
    use streamux_stages::{Base64Decode, Base64Encode, Rot13};

    fn channel(raw: UnixStream) -> FilteredChannel {
        FilteredChannel::new(raw, ChannelConfig::builtin()).unwrap()
    }

    #[test]
    fn test_write_is_buffered_until_flush() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        peer.set_nonblocking(true).unwrap();
        let mut ch = channel(a);

        assert_eq!(ch.write(b"hello").unwrap(), 5);
        assert_eq!(ch.pending_output_len(), 5);
        let mut buf = [0u8; 16];
        assert_eq!(
            peer.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );

        assert_eq!(ch.flush().unwrap(), 5);
        assert_eq!(ch.pending_output_len(), 0);
        assert_eq!(peer.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_flush_is_idempotent_when_empty() {
        let (a, _peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        assert_eq!(ch.flush().unwrap(), 0);
        assert_eq!(ch.flush().unwrap(), 0);
    }

    #[test]
    fn test_write_chain_applies_in_order() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        ch.push_write_stage(Box::new(Base64Encode::new())).unwrap();
        ch.push_write_stage(Box::new(Rot13)).unwrap();

        ch.write(b"0  ").unwrap();
        ch.drain().unwrap();

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        // base64("0  ") = "MCAg", then rot13
        assert_eq!(&buf, b"ZPNt");
    }

    #[test]
    fn test_read_chain_applies_in_reverse() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        ch.push_read_stage(Box::new(Base64Decode::new())).unwrap();
        ch.push_read_stage(Box::new(Rot13)).unwrap();

        peer.write_all(b"ZPNt").unwrap();
        assert_eq!(ch.read(32).unwrap(), b"0  ");
    }

    #[test]
    fn test_chain_sealed_after_first_io() {
        let (a, _peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        ch.push_write_stage(Box::new(Rot13)).unwrap();
        assert!(!ch.is_sealed());

        ch.write(b"x").unwrap();
        assert!(ch.is_sealed());
        assert!(matches!(ch.push_write_stage(Box::new(Rot13)), Err(Error::ChainSealed)));
        assert!(matches!(ch.push_read_stage(Box::new(Rot13)), Err(Error::ChainSealed)));
        assert_eq!(ch.write_chain().len(), 1);
    }

    #[test]
    fn test_backpressure_short_count() {
        let (a, _peer) = UnixStream::pair().unwrap();
        let config = ChannelConfig::builtin().max_pending_output(8);
        let mut ch = FilteredChannel::new(a, config).unwrap();

        assert_eq!(ch.write(b"0123456789abcdef").unwrap(), 8);
        assert_eq!(ch.pending_output_len(), 8);
        assert_eq!(ch.write(b"more").unwrap(), 0);

        ch.flush().unwrap();
        assert_eq!(ch.write(b"more").unwrap(), 4);
    }

    #[test]
    fn test_eof_signal() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        peer.write_all(b"bye").unwrap();
        drop(peer);

        assert_eq!(ch.read(32).unwrap(), b"bye");
        assert!(!ch.is_eof());
        assert!(ch.read(32).unwrap_err().is_end_of_stream());
        assert!(ch.is_eof());
        assert!(ch.read(32).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_eof_finishes_read_chain() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        ch.push_read_stage(streamux_core::stage::from_fn("id", |c, out| {
            out.extend_from_slice(c);
            Ok(())
        }))
        .unwrap();
        ch.push_read_stage(Box::new(Base64Decode::new())).unwrap();

        peer.write_all(b"Zm9").unwrap();
        drop(peer);

        // three symbols buffered, no full quad yet
        assert!(ch.read(32).unwrap().is_empty());
        // the decoder rejects the leftover at end of stream
        assert!(matches!(ch.read(32), Err(Error::Transform { .. })));
        assert!(ch.is_eof());
    }

    #[test]
    fn test_nonblocking_read_without_data_is_empty() {
        let (a, _peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        assert!(ch.read(32).unwrap().is_empty());
        assert!(!ch.is_eof());
        assert!(ch.read(0).unwrap().is_empty());
    }

    #[test]
    fn test_new_switches_stream_to_nonblocking() {
        let (a, _peer) = UnixStream::pair().unwrap();
        assert!(!stream::is_nonblocking(a.as_fd()).unwrap());
        let mut ch = channel(a);
        assert!(stream::is_nonblocking(ch.as_fd()).unwrap());

        ch.set_nonblocking(false).unwrap();
        assert!(!stream::is_nonblocking(ch.as_fd()).unwrap());
    }

    #[test]
    fn test_partial_flush_on_full_socket() {
        const TOTAL: usize = 4 << 20;
        let (a, mut peer) = UnixStream::pair().unwrap();
        let config = ChannelConfig::builtin().max_pending_output(TOTAL);
        let mut ch = FilteredChannel::new(a, config).unwrap();
        assert_eq!(ch.write(&vec![b'x'; TOTAL]).unwrap(), TOTAL);

        // the socket buffer takes part of it, then refuses more
        let first = ch.flush().unwrap();
        assert!(first > 0 && first < TOTAL);
        assert_eq!(ch.flush().unwrap(), 0);
        assert_eq!(ch.pending_output_len(), TOTAL - first);

        let reader = std::thread::spawn(move || {
            let mut sink = Vec::new();
            peer.read_to_end(&mut sink).unwrap();
            sink.len()
        });
        ch.drain().unwrap();
        assert_eq!(ch.pending_output_len(), 0);
        drop(ch);
        assert_eq!(reader.join().unwrap(), TOTAL);
    }

    #[test]
    fn test_read_buffer_is_capped() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        peer.write_all(b"abc").unwrap();
        assert_eq!(ch.read(usize::MAX).unwrap(), b"abc");
    }

    #[test]
    fn test_finish_emits_padding_and_blocks_writes() {
        let (a, mut peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        ch.push_write_stage(Box::new(Base64Encode::new())).unwrap();

        ch.write(b"f").unwrap();
        assert_eq!(ch.pending_output_len(), 0);
        ch.finish().unwrap();

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"Zg==");
        assert!(ch.write(b"x").is_err());
    }

    #[test]
    fn test_file_backed_channel() {
        let file = tempfile::tempfile().unwrap();
        let mut observer = file.try_clone().unwrap();
        let mut ch = FilteredChannel::new(file, ChannelConfig::builtin()).unwrap();
        ch.push_write_stage(Box::new(Rot13)).unwrap();

        ch.write(b"Hello world!").unwrap();
        ch.drain().unwrap();

        observer.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        observer.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Uryyb jbeyq!");
    }

    #[test]
    fn test_rejects_read_only_stream() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = std::fs::File::open(tmp.path()).unwrap();
        let err = FilteredChannel::new(file, ChannelConfig::builtin()).unwrap_err();
        assert!(matches!(err, Error::InvalidStream(_)));
    }

    #[test]
    fn test_flush_surfaces_io_failure() {
        let (a, peer) = UnixStream::pair().unwrap();
        let mut ch = channel(a);
        drop(peer);
        ch.write(b"into the void").unwrap();
        assert!(matches!(ch.flush(), Err(Error::Io(_))));
    }
}
