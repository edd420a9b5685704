//! Blocking duplex byte channels.
//!
//! This is the lowest layer of pipelink. A [`ByteChannel`] pairs one
//! read-only [`InputStream`] with one write-only [`OutputStream`], each backed
//! by any pipe/socket-like medium:
//! - in-memory bounded pipes ([`memory`]), mostly for tests
//! - named pipes (FIFOs) shared between two processes ([`fifo`])
//! - Unix socket pairs
//!
//! Reads may be short; writes are always completed or fail.

pub mod error;
pub mod memory;
pub mod stream;

#[cfg(unix)]
pub mod fifo;

pub use error::{ChannelError, Result};
pub use memory::{duplex, pipe, PipeReader, PipeWriter, DEFAULT_PIPE_CAPACITY};
pub use stream::{ByteChannel, InputStream, OutputStream, ReadOutcome};

#[cfg(unix)]
pub use fifo::{open_fifo_pair, FifoChannel};
