use std::io::{Read, Write};

use pipelink_transport::ByteChannel;

use crate::codec::{Frame, FrameConfig};
use crate::error::Result;
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// Message-oriented view of one byte channel.
///
/// Owns the channel and its receive buffer exclusively. At most one reader
/// and one writer may drive it at a time; use [`Framer::split`] to hand the
/// two directions to separate threads.
pub struct Framer<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<R: Read, W: Write> Framer<R, W> {
    /// Frame a channel with default configuration.
    pub fn new(channel: ByteChannel<R, W>) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    /// Frame a channel with explicit configuration.
    pub fn with_config(channel: ByteChannel<R, W>, config: FrameConfig) -> Self {
        let (input, output) = channel.split();
        Self {
            reader: FrameReader::from_stream(input, config.clone()),
            writer: FrameWriter::from_stream(output, config),
        }
    }

    /// Send one payload as a frame. See [`FrameWriter::send`].
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)
    }

    /// Receive the next frame, `Ok(None)` on clean end of stream.
    /// See [`FrameReader::read_frame`].
    pub fn receive(&mut self) -> Result<Option<Frame>> {
        self.reader.read_frame()
    }

    /// Close both directions. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.reader.close();
        self.writer.close()
    }
}

impl<R, W> Framer<R, W> {
    /// Separate the receive and send directions.
    pub fn split(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }

    /// Whether both directions have been closed.
    pub fn is_closed(&self) -> bool {
        self.reader.is_closed() && self.writer.is_closed()
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.reader.buffered()
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        self.reader.config()
    }
}
