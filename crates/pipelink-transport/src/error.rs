use std::path::PathBuf;

/// Errors that can occur on a byte channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The underlying medium failed.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read returned no bytes without signalling end of stream.
    #[error("read returned no data without end of stream")]
    ShortRead,

    /// The medium stopped accepting bytes in the middle of a write.
    #[error("write stalled after {written} of {expected} bytes")]
    WriteZero { written: usize, expected: usize },

    /// The local side of the channel was already closed.
    #[error("channel closed")]
    Closed,

    /// Failed to open a named endpoint.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but is not a named pipe.
    #[error("not a fifo: {path}")]
    NotAFifo { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ChannelError>;
