use std::io::{ErrorKind, Read, Write};

use tracing::debug;

use crate::error::{ChannelError, Result};

/// Result of a single successful [`InputStream::read_some`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were placed at the start of the buffer, `0 < n <= buf.len()`.
    Data(usize),
    /// The writer on the other end has gone away and no bytes remain.
    EndOfStream,
}

/// Read-only half of a byte channel.
///
/// Blocks until at least one byte is available or the stream ends.
pub struct InputStream<R> {
    inner: Option<R>,
}

impl<R: Read> InputStream<R> {
    /// Wrap a readable medium.
    pub fn new(inner: R) -> Self {
        Self { inner: Some(inner) }
    }

    /// Read whatever is available, up to `buf.len()` bytes (blocking).
    ///
    /// `buf` must not be empty. A medium that reports "no data yet" instead of
    /// blocking (non-blocking descriptors) violates the channel contract and
    /// surfaces as [`ChannelError::ShortRead`].
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let inner = self.inner.as_mut().ok_or(ChannelError::Closed)?;
        if buf.is_empty() {
            return Err(ChannelError::ShortRead);
        }

        loop {
            match inner.read(buf) {
                Ok(0) => return Ok(ReadOutcome::EndOfStream),
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(ChannelError::ShortRead)
                }
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }
}

impl<R> InputStream<R> {
    /// Release the underlying medium. Calling this again is a no-op.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("input stream closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrow the underlying medium, if still open.
    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    /// Consume the stream and return the medium, if still open.
    pub fn into_inner(self) -> Option<R> {
        self.inner
    }
}

/// Write-only half of a byte channel.
pub struct OutputStream<W> {
    inner: Option<W>,
}

impl<W: Write> OutputStream<W> {
    /// Wrap a writable medium.
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Write every byte of `bytes`, retrying short writes (blocking).
    ///
    /// Returns only once the whole slice has been handed to the medium and
    /// flushed, or on the first unrecoverable error. A medium that refuses
    /// bytes instead of blocking (non-blocking descriptors) surfaces as
    /// [`ChannelError::WriteZero`].
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let inner = self.inner.as_mut().ok_or(ChannelError::Closed)?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match inner.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(ChannelError::WriteZero {
                        written: offset,
                        expected: bytes.len(),
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Non-blocking media break the blocking contract; never spin.
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(ChannelError::WriteZero {
                        written: offset,
                        expected: bytes.len(),
                    })
                }
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }

        loop {
            match inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }

    /// Flush and release the underlying medium. Calling this again is a no-op.
    ///
    /// The medium is released even when the final flush fails.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut inner) => {
                let flushed = inner.flush();
                drop(inner);
                debug!("output stream closed");
                flushed.map_err(ChannelError::Io)
            }
            None => Ok(()),
        }
    }
}

impl<W> OutputStream<W> {
    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrow the underlying medium, if still open.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Consume the stream and return the medium, if still open.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}

/// A duplex byte transport: one input stream and one output stream.
///
/// The two directions are independent. They may be backed by the same
/// medium (a socket) or by two unrelated ones (two named pipes).
pub struct ByteChannel<R, W> {
    input: InputStream<R>,
    output: OutputStream<W>,
}

impl<R: Read, W: Write> ByteChannel<R, W> {
    /// Build a channel from a readable and a writable medium.
    pub fn new(input: R, output: W) -> Self {
        Self::from_parts(InputStream::new(input), OutputStream::new(output))
    }

    /// See [`InputStream::read_some`].
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.input.read_some(buf)
    }

    /// See [`OutputStream::write_all`].
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.write_all(bytes)
    }

    /// Close both directions. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.input.close();
        self.output.close()
    }
}

impl<R, W> ByteChannel<R, W> {
    /// Build a channel from already-wrapped halves.
    pub fn from_parts(input: InputStream<R>, output: OutputStream<W>) -> Self {
        Self { input, output }
    }

    /// Separate the two directions so they can be driven from different threads.
    pub fn split(self) -> (InputStream<R>, OutputStream<W>) {
        (self.input, self.output)
    }

    /// Whether both directions have been closed.
    pub fn is_closed(&self) -> bool {
        self.input.is_closed() && self.output.is_closed()
    }

    /// Borrow the input half.
    pub fn input(&self) -> &InputStream<R> {
        &self.input
    }

    /// Borrow the output half.
    pub fn output(&self) -> &OutputStream<W> {
        &self.output
    }
}

#[cfg(unix)]
impl ByteChannel<std::os::unix::net::UnixStream, std::os::unix::net::UnixStream> {
    /// Use a connected Unix socket for both directions.
    ///
    /// The peer observes end of stream only once both halves are closed.
    pub fn from_unix_stream(stream: std::os::unix::net::UnixStream) -> Result<Self> {
        let reader = stream.try_clone()?;
        Ok(Self::new(reader, stream))
    }
}

impl<R, W> std::fmt::Debug for ByteChannel<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteChannel")
            .field("input_closed", &self.input.is_closed())
            .field("output_closed", &self.output.is_closed())
            .finish()
    }
}
