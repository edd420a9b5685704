use std::io::Read;

use bytes::BytesMut;
use pipelink_transport::{InputStream, ReadOutcome};
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete frames from the input half of a byte channel.
///
/// Handles partial reads internally — callers always get complete frames.
/// Bytes that arrive after a complete frame stay buffered for the next call.
pub struct FrameReader<R> {
    input: InputStream<R>,
    buf: BytesMut,
    scratch: Vec<u8>,
    config: FrameConfig,
}

impl<R: Read> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(input: R) -> Self {
        Self::from_stream(InputStream::new(input), FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(input: R, config: FrameConfig) -> Self {
        Self::from_stream(InputStream::new(input), config)
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames and
    /// [`FrameError::TruncatedStream`] when it ends inside one.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_frame_size)? {
                trace!(len = frame.len(), buffered = self.buf.len(), "frame received");
                return Ok(Some(frame));
            }

            match self.input.read_some(&mut self.scratch)? {
                ReadOutcome::Data(n) => self.buf.extend_from_slice(&self.scratch[..n]),
                ReadOutcome::EndOfStream if self.buf.is_empty() => return Ok(None),
                ReadOutcome::EndOfStream => {
                    return Err(FrameError::TruncatedStream {
                        buffered: self.buf.len(),
                    })
                }
            }
        }
    }
}

impl<R> FrameReader<R> {
    /// Create a frame reader over an already-wrapped input stream.
    pub fn from_stream(input: InputStream<R>, config: FrameConfig) -> Self {
        let chunk = config.read_chunk_size.max(1);
        Self {
            input,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: vec![0u8; chunk],
            config,
        }
    }

    /// Close the input and discard anything buffered. Idempotent.
    pub fn close(&mut self) {
        self.buf.clear();
        self.input.close();
    }

    /// Whether the input has been closed.
    pub fn is_closed(&self) -> bool {
        self.input.is_closed()
    }

    /// Number of bytes received but not yet returned as part of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying input stream.
    pub fn get_ref(&self) -> &InputStream<R> {
        &self.input
    }

    /// Consume the reader and return the input stream.
    ///
    /// Any buffered partial frame is dropped.
    pub fn into_inner(self) -> InputStream<R> {
        self.input
    }

    /// Update maximum frame size for subsequent frame decoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
