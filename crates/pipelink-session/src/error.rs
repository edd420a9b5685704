use pipelink_frame::FrameError;
use pipelink_transport::ChannelError;

use crate::state::SessionState;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Sending was attempted before the session was established.
    #[error("session not established (state: {state})")]
    NotEstablished { state: SessionState },

    /// The peer ended its side of the link between two frames.
    #[error("peer closed the session")]
    PeerClosed,

    /// An I/O or framing fault ended the session.
    #[error("session failed: {0}")]
    Fatal(#[source] FrameError),

    /// The session, or the direction being used, is already shut down.
    #[error("session is {state}")]
    Terminated { state: SessionState },

    /// The underlying channel could not be set up.
    #[error("connect failed: {0}")]
    Connect(#[from] ChannelError),
}

impl SessionError {
    /// Whether this is an orderly shutdown by the peer rather than a fault.
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, SessionError::PeerClosed)
    }

    /// Whether this error ended the session because of a fault.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Fatal(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
