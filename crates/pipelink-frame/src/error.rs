use pipelink_transport::ChannelError;

/// Errors that can occur while framing or unframing messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A payload, outgoing or declared by an incoming header, exceeds the limit.
    #[error("frame too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// The stream ended with part of a frame still buffered.
    #[error("stream ended mid-frame ({buffered} bytes buffered)")]
    TruncatedStream { buffered: usize },

    /// The underlying byte channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
