//! Scripted in-memory carrier for exercising the state machines.
//!
//! A [`MockStream`] replays a script of read steps and records everything
//! written to it. Clones share state, so a test can keep one handle while the
//! session owns the other.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum Step {
    Data(Vec<u8>),
    WouldBlock,
    Fail(io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteGate {
    Open,
    After(usize),
    Closed,
    Alternate { block_next: bool },
}

#[derive(Debug)]
struct Inner {
    script: VecDeque<Step>,
    written: Vec<u8>,
    write_cap: Option<usize>,
    gate: WriteGate,
    block_when_drained: bool,
    read_calls: u64,
    write_calls: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            written: Vec::new(),
            write_cap: None,
            gate: WriteGate::Open,
            block_when_drained: false,
            read_calls: 0,
            write_calls: 0,
        }
    }
}

/// Mock duplex stream with injectable would-block points.
#[derive(Debug, Clone, Default)]
pub struct MockStream {
    inner: Arc<Mutex<Inner>>,
}

impl MockStream {
    /// Creates an empty mock. Reads past the end of the script return EOF.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a chunk that a single `read` call may return.
    #[must_use]
    pub fn read(self, data: &[u8]) -> Self {
        self.push_read(data);
        self
    }

    /// Appends a `WouldBlock` read step.
    #[must_use]
    pub fn would_block(self) -> Self {
        self.lock().script.push_back(Step::WouldBlock);
        self
    }

    /// Appends a read step failing with `kind`.
    #[must_use]
    pub fn fail_read(self, kind: io::ErrorKind) -> Self {
        self.lock().script.push_back(Step::Fail(kind));
        self
    }

    /// Makes an exhausted script report `WouldBlock` instead of EOF.
    #[must_use]
    pub fn block_when_drained(self) -> Self {
        self.lock().block_when_drained = true;
        self
    }

    /// Limits how many bytes one `write` call accepts.
    #[must_use]
    pub fn write_cap(self, cap: usize) -> Self {
        self.lock().write_cap = Some(cap.max(1));
        self
    }

    /// Lets `n` writes through, then blocks until [`MockStream::unblock_writes`].
    #[must_use]
    pub fn block_writes_after(self, n: usize) -> Self {
        self.lock().gate = WriteGate::After(n);
        self
    }

    /// Alternates between a blocked and an accepted write, starting blocked.
    #[must_use]
    pub fn block_every_other_write(self) -> Self {
        self.lock().gate = WriteGate::Alternate { block_next: true };
        self
    }

    /// Appends a read chunk to a mock that is already in use.
    pub fn push_read(&self, data: &[u8]) {
        self.lock().script.push_back(Step::Data(data.to_vec()));
    }

    /// Re-opens writes after a block.
    pub fn unblock_writes(&self) {
        self.lock().gate = WriteGate::Open;
    }

    /// Returns every byte accepted so far.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Returns the accepted bytes as text.
    #[must_use]
    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.lock().written).into_owned()
    }

    /// Forgets the bytes written so far.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// Number of `read` calls received.
    #[must_use]
    pub fn read_calls(&self) -> u64 {
        self.lock().read_calls
    }

    /// Number of `write` calls received.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.lock().write_calls
    }

    /// Total number of `read` and `write` calls.
    #[must_use]
    pub fn io_calls(&self) -> u64 {
        let inner = self.lock();
        inner.read_calls + inner.write_calls
    }

    /// Returns true once every scripted read step was consumed.
    #[must_use]
    pub fn script_drained(&self) -> bool {
        self.lock().script.is_empty()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.read_calls += 1;
        match inner.script.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    inner.script.push_front(Step::Data(rest));
                }
                Ok(n)
            }
            Some(Step::WouldBlock) => Err(io::ErrorKind::WouldBlock.into()),
            Some(Step::Fail(kind)) => Err(kind.into()),
            None if inner.block_when_drained => Err(io::ErrorKind::WouldBlock.into()),
            None => Ok(0),
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.write_calls += 1;
        match inner.gate {
            WriteGate::Open => {}
            WriteGate::Closed => return Err(io::ErrorKind::WouldBlock.into()),
            WriteGate::After(0) => {
                inner.gate = WriteGate::Closed;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            WriteGate::After(n) => inner.gate = WriteGate::After(n - 1),
            WriteGate::Alternate { block_next } => {
                inner.gate = WriteGate::Alternate {
                    block_next: !block_next,
                };
                if block_next {
                    return Err(io::ErrorKind::WouldBlock.into());
                }
            }
        }
        let n = inner.write_cap.map_or(buf.len(), |cap| cap.min(buf.len()));
        inner.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
