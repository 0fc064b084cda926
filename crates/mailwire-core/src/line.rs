//! Line-oriented buffered I/O over a non-blocking transport.
//!
//! [`LineIo`] owns the session's read and write buffers. It never blocks:
//! whenever the transport reports `WouldBlock` the partial state stays in the
//! buffers and [`Error::WouldBlock`] is returned, so the caller can re-invoke
//! the same method later without losing or duplicating bytes.

use std::io::{self, Read, Write};

use bytes::{Buf, BytesMut};

use crate::{Error, Result};

/// Default initial read buffer size.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Direction the last would-block condition was hit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Waiting for the transport to become readable.
    #[default]
    Read,
    /// Waiting for the transport to become writable.
    Write,
}

/// Buffered line reader and resumable writer.
#[derive(Debug)]
pub struct LineIo {
    /// Initialised read storage; only `rbuf[..filled]` holds received bytes.
    rbuf: Vec<u8>,
    /// End of received bytes in `rbuf`.
    filled: usize,
    /// Consumed cursor into `rbuf`.
    head: usize,
    /// Bytes before this offset are known to contain no LF.
    scan: usize,
    /// Logical read capacity, only ever grows.
    capacity: usize,
    /// Bytes queued but not yet accepted by the transport.
    wbuf: BytesMut,
    blocked_on: Direction,
    read_calls: u64,
    write_calls: u64,
}

impl Default for LineIo {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}

impl LineIo {
    /// Creates an adapter with the given initial read capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(16);
        Self {
            rbuf: Vec::with_capacity(capacity),
            filled: 0,
            head: 0,
            scan: 0,
            capacity,
            wbuf: BytesMut::with_capacity(capacity),
            blocked_on: Direction::Read,
            read_calls: 0,
            write_calls: 0,
        }
    }

    /// Appends bytes to the write buffer without touching the transport.
    pub fn queue(&mut self, data: &[u8]) {
        self.wbuf.extend_from_slice(data);
    }

    /// Drains the write buffer into the transport.
    ///
    /// Partial writes advance the buffer by exactly the number of bytes the
    /// transport accepted. Calling this again after [`Error::WouldBlock`]
    /// continues with the unsent remainder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] if the transport is not writable,
    /// [`Error::ConnectionClosed`] if it accepted zero bytes, or the
    /// transport's I/O error.
    pub fn flush<W: Write + ?Sized>(&mut self, io: &mut W) -> Result<()> {
        while !self.wbuf.is_empty() {
            self.write_calls += 1;
            match io.write(&self.wbuf) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    if n < self.wbuf.len() {
                        tracing::trace!(sent = n, left = self.wbuf.len() - n, "partial write");
                    }
                    self.wbuf.advance(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.blocked(Direction::Write, e)),
            }
        }
        io.flush().map_err(|e| self.blocked(Direction::Write, e))
    }

    /// Queues `data` and attempts to flush it.
    ///
    /// Call this once per payload; after [`Error::WouldBlock`] retry with
    /// [`LineIo::flush`], which resumes where the transport stopped.
    ///
    /// # Errors
    ///
    /// See [`LineIo::flush`].
    pub fn send<W: Write + ?Sized>(&mut self, io: &mut W, data: &[u8]) -> Result<()> {
        self.queue(data);
        self.flush(io)
    }

    /// Reads one line, returning it without its CRLF or LF terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] when no complete line is available yet,
    /// [`Error::ConnectionClosed`] on a zero-length read, and
    /// [`Error::NoMemory`] if the buffer cannot grow.
    pub fn read_line_bytes<R: Read + ?Sized>(&mut self, io: &mut R) -> Result<Vec<u8>> {
        loop {
            if let Some(pos) = self.rbuf[self.scan..self.filled]
                .iter()
                .position(|&b| b == b'\n')
            {
                let end = self.scan + pos;
                let mut line_end = end;
                if line_end > self.head && self.rbuf[line_end - 1] == b'\r' {
                    line_end -= 1;
                }
                let line = self.rbuf[self.head..line_end].to_vec();
                self.head = end + 1;
                self.scan = self.head;
                return Ok(line);
            }
            self.scan = self.filled;
            self.fill(io)?;
        }
    }

    /// Reads one line as (lossy) UTF-8 text.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line_bytes`].
    pub fn read_line<R: Read + ?Sized>(&mut self, io: &mut R) -> Result<String> {
        let bytes = self.read_line_bytes(io)?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Reads exactly `n` bytes, ignoring any line terminators inside them.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line_bytes`].
    pub fn read_exact<R: Read + ?Sized>(&mut self, io: &mut R, n: usize) -> Result<Vec<u8>> {
        while self.filled - self.head < n {
            self.fill_at_least(io, n)?;
        }
        let data = self.rbuf[self.head..self.head + n].to_vec();
        self.head += n;
        self.scan = self.head;
        Ok(data)
    }

    /// Returns true if received bytes are waiting to be consumed.
    #[must_use]
    pub fn has_buffered_input(&self) -> bool {
        self.head < self.filled
    }

    /// Returns the number of queued bytes not yet written.
    #[must_use]
    pub fn pending_output(&self) -> usize {
        self.wbuf.len()
    }

    /// Returns the current logical read capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Direction of the most recent would-block.
    #[must_use]
    pub const fn blocked_on(&self) -> Direction {
        self.blocked_on
    }

    /// Records a would-block on `direction`, e.g. during a TLS handshake.
    pub fn set_blocked_on(&mut self, direction: Direction) {
        self.blocked_on = direction;
    }

    /// Number of `read` calls issued on the transport.
    #[must_use]
    pub const fn read_calls(&self) -> u64 {
        self.read_calls
    }

    /// Number of `write` calls issued on the transport.
    #[must_use]
    pub const fn write_calls(&self) -> u64 {
        self.write_calls
    }

    /// Drops all buffered data, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.filled = 0;
        self.head = 0;
        self.scan = 0;
        self.wbuf.clear();
    }

    fn blocked(&mut self, direction: Direction, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::WouldBlock {
            self.blocked_on = direction;
        }
        Error::from(err)
    }

    /// Moves unconsumed bytes to the front of the buffer.
    fn compact(&mut self) {
        if self.head > 0 {
            self.rbuf.copy_within(self.head..self.filled, 0);
            self.filled -= self.head;
            self.scan -= self.head;
            self.head = 0;
        }
    }

    fn grow_to(&mut self, wanted: usize) -> Result<()> {
        let mut capacity = self.capacity;
        while capacity < wanted {
            capacity = capacity.checked_mul(2).ok_or(Error::NoMemory)?;
        }
        if capacity != self.capacity {
            self.rbuf
                .try_reserve_exact(capacity - self.rbuf.len())
                .map_err(|_| Error::NoMemory)?;
            tracing::trace!(from = self.capacity, to = capacity, "read buffer grown");
            self.capacity = capacity;
        }
        Ok(())
    }

    fn fill<R: Read + ?Sized>(&mut self, io: &mut R) -> Result<()> {
        self.compact();
        if self.filled >= self.capacity {
            self.grow_to(self.capacity + 1)?;
        }
        self.read_some(io)
    }

    fn fill_at_least<R: Read + ?Sized>(&mut self, io: &mut R, n: usize) -> Result<()> {
        self.compact();
        self.grow_to(n.max(self.filled + 1))?;
        self.read_some(io)
    }

    fn read_some<R: Read + ?Sized>(&mut self, io: &mut R) -> Result<()> {
        // Zeroed once per growth, never per read.
        if self.rbuf.len() < self.capacity {
            self.rbuf.resize(self.capacity, 0);
        }
        loop {
            self.read_calls += 1;
            match io.read(&mut self.rbuf[self.filled..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    self.filled += n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.blocked(Direction::Read, e)),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::MockStream;
    use proptest::prelude::*;

    #[test]
    fn reads_crlf_and_lf_lines() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new().read(b"+OK ready\r\nbare\n");
        assert_eq!(io.read_line(&mut mock).unwrap(), "+OK ready");
        assert_eq!(io.read_line(&mut mock).unwrap(), "bare");
    }

    #[test]
    fn partial_line_survives_would_block() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new()
            .read(b"250-exa")
            .would_block()
            .read(b"mple.com\r\n");
        assert!(io.read_line(&mut mock).unwrap_err().is_would_block());
        assert_eq!(io.blocked_on(), Direction::Read);
        assert_eq!(io.read_line(&mut mock).unwrap(), "250-example.com");
    }

    #[test]
    fn zero_read_is_connection_closed() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new().read(b"no terminator");
        assert!(matches!(
            io.read_line(&mut mock),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn long_line_grows_geometrically() {
        let mut io = LineIo::with_capacity(16);
        let mut line = vec![b'x'; 100];
        line.extend_from_slice(b"\r\n");
        let mut mock = MockStream::new().read(&line);
        let got = io.read_line_bytes(&mut mock).unwrap();
        assert_eq!(got.len(), 100);
        assert_eq!(io.capacity(), 128);
    }

    #[test]
    fn compaction_reuses_initialised_storage() {
        let mut io = LineIo::with_capacity(16);
        let mut mock = MockStream::new()
            .read(b"+OK one\r\n+OK t")
            .would_block()
            .read(b"wo\r\n+OK three\r\n");
        assert_eq!(io.read_line(&mut mock).unwrap(), "+OK one");
        assert!(io.read_line(&mut mock).unwrap_err().is_would_block());
        assert_eq!(io.read_line(&mut mock).unwrap(), "+OK two");
        assert_eq!(io.read_line(&mut mock).unwrap(), "+OK three");
        assert!(!io.has_buffered_input());
        assert_eq!(io.capacity(), 16);
        assert_eq!(io.rbuf.len(), 16);
    }

    #[test]
    fn read_exact_ignores_terminators() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new().read(b"ab\r\ncd)\r\n");
        assert_eq!(io.read_exact(&mut mock, 6).unwrap(), b"ab\r\ncd");
        assert_eq!(io.read_line(&mut mock).unwrap(), ")");
    }

    #[test]
    fn partial_write_keeps_remainder() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new().write_cap(4).block_writes_after(1);
        assert!(io.send(&mut mock, b"NOOP\r\n").unwrap_err().is_would_block());
        assert_eq!(io.pending_output(), 2);
        assert_eq!(io.blocked_on(), Direction::Write);
        mock.unblock_writes();
        io.flush(&mut mock).unwrap();
        assert_eq!(mock.written(), b"NOOP\r\n");
    }

    #[test]
    fn send_then_read_back_round_trips() {
        let mut io = LineIo::default();
        let mut mock = MockStream::new();
        io.send(&mut mock, b"MAIL FROM:<a@b.example>\r\n").unwrap();

        let wire = mock.written().to_vec();
        let mut server = LineIo::default();
        let mut replay = MockStream::new().read(&wire);
        assert_eq!(
            server.read_line(&mut replay).unwrap(),
            "MAIL FROM:<a@b.example>"
        );
    }

    proptest! {
        #[test]
        fn draining_preserves_bytes(
            payload in proptest::collection::vec(any::<u8>(), 1..4096),
            cap in 1usize..64,
        ) {
            let mut io = LineIo::with_capacity(16);
            let mut mock = MockStream::new().write_cap(cap).block_every_other_write();
            let mut result = io.send(&mut mock, &payload);
            let mut rounds = 0;
            while let Err(Error::WouldBlock) = result {
                rounds += 1;
                prop_assert!(rounds < 100_000);
                result = io.flush(&mut mock);
            }
            prop_assert!(result.is_ok());
            prop_assert_eq!(mock.written(), &payload[..]);
        }
    }
}
