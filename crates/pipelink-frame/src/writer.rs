use std::io::Write;

use bytes::BytesMut;
use pipelink_transport::OutputStream;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to the output half of a byte channel.
///
/// Header and payload go out as one logical write. A single `FrameWriter`
/// assumes a single caller; concurrent senders must serialize externally.
pub struct FrameWriter<W> {
    output: OutputStream<W>,
    buf: BytesMut,
    config: FrameConfig,
}

impl<W: Write> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(output: W) -> Self {
        Self::from_stream(OutputStream::new(output), FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(output: W, config: FrameConfig) -> Self {
        Self::from_stream(OutputStream::new(output), config)
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.payload.as_ref())
    }

    /// Encode and send one payload (blocking).
    ///
    /// An oversized payload is rejected before any byte reaches the channel.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf, self.config.max_frame_size)?;
        self.output.write_all(&self.buf)?;
        trace!(len = payload.len(), "frame sent");
        Ok(())
    }

    /// Flush and close the output. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.output.close()?;
        Ok(())
    }
}

impl<W> FrameWriter<W> {
    /// Create a frame writer over an already-wrapped output stream.
    pub fn from_stream(output: OutputStream<W>, config: FrameConfig) -> Self {
        Self {
            output,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Whether the output has been closed.
    pub fn is_closed(&self) -> bool {
        self.output.is_closed()
    }

    /// Borrow the underlying output stream.
    pub fn get_ref(&self) -> &OutputStream<W> {
        &self.output
    }

    /// Consume the writer and return the output stream.
    pub fn into_inner(self) -> OutputStream<W> {
        self.output
    }

    /// Update maximum frame size for subsequent frame encoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
