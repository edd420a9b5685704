//! In-memory bounded pipes.
//!
//! Behaves like an OS pipe: reads block while the buffer is empty, writes
//! block while it is full and may be short when only part of the data fits,
//! dropping the writer yields end of stream and dropping the reader makes
//! further writes fail with `BrokenPipe`.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::stream::ByteChannel;

/// Default buffer size, matching the Linux pipe buffer.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

struct PipeState {
    buf: VecDeque<u8>,
    capacity: usize,
    reader_open: bool,
    writer_open: bool,
}

struct Shared {
    state: Mutex<PipeState>,
    readable: Condvar,
    writable: Condvar,
}

impl Shared {
    fn lock(&self) -> io::Result<MutexGuard<'_, PipeState>> {
        self.state.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> io::Error {
    io::Error::other("pipe lock poisoned")
}

/// Create a unidirectional pipe holding at most `capacity` unread bytes.
///
/// A zero capacity is rounded up to one byte.
pub fn pipe(capacity: usize) -> (PipeReader, PipeWriter) {
    let shared = Arc::new(Shared {
        state: Mutex::new(PipeState {
            buf: VecDeque::with_capacity(capacity.clamp(1, DEFAULT_PIPE_CAPACITY)),
            capacity: capacity.max(1),
            reader_open: true,
            writer_open: true,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });

    (
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

/// Create two cross-wired channels: bytes written on one are read on the other.
pub fn duplex(
    capacity: usize,
) -> (
    ByteChannel<PipeReader, PipeWriter>,
    ByteChannel<PipeReader, PipeWriter>,
) {
    let (a_to_b_reader, a_to_b_writer) = pipe(capacity);
    let (b_to_a_reader, b_to_a_writer) = pipe(capacity);

    (
        ByteChannel::new(b_to_a_reader, a_to_b_writer),
        ByteChannel::new(a_to_b_reader, b_to_a_writer),
    )
}

/// Reading end of an in-memory pipe.
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock()?;
        loop {
            if !state.buf.is_empty() {
                let n = buf.len().min(state.buf.len());
                for (dst, src) in buf.iter_mut().zip(state.buf.drain(..n)) {
                    *dst = src;
                }
                self.shared.writable.notify_all();
                return Ok(n);
            }
            if !state.writer_open {
                return Ok(0);
            }
            state = self.shared.readable.wait(state).map_err(|_| poisoned())?;
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.reader_open = false;
        self.shared.writable.notify_all();
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader").finish_non_exhaustive()
    }
}

/// Writing end of an in-memory pipe.
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock()?;
        loop {
            if !state.reader_open {
                return Err(io::Error::from(ErrorKind::BrokenPipe));
            }
            let free = state.capacity - state.buf.len();
            if free > 0 {
                let n = free.min(buf.len());
                state.buf.extend(&buf[..n]);
                self.shared.readable.notify_all();
                return Ok(n);
            }
            state = self.shared.writable.wait(state).map_err(|_| poisoned())?;
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.writer_open = false;
        self.shared.readable.notify_all();
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter").finish_non_exhaustive()
    }
}
