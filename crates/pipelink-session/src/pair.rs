//! Two sessions cross-wired in memory.
//!
//! Each session's output is the other's input, the same 2-cycle a launcher
//! builds out of two named pipes, without leaving the process.

use pipelink_transport::{duplex, PipeReader, PipeWriter, DEFAULT_PIPE_CAPACITY};

use crate::session::{PeerSession, SessionConfig};

/// A session over an in-memory pipe pair.
pub type MemorySession = PeerSession<PipeReader, PipeWriter>;

/// Open two connected sessions with pipe buffers the size of an OS pipe.
pub fn open_pair(config: SessionConfig) -> (MemorySession, MemorySession) {
    open_pair_with_capacity(DEFAULT_PIPE_CAPACITY, config)
}

/// Open two connected sessions with an explicit per-direction buffer size.
///
/// The sessions are labelled `<label>-a` and `<label>-b`.
pub fn open_pair_with_capacity(
    capacity: usize,
    config: SessionConfig,
) -> (MemorySession, MemorySession) {
    let (left, right) = duplex(capacity);
    let left_config = SessionConfig {
        label: format!("{}-a", config.label),
        ..config.clone()
    };
    let right_config = SessionConfig {
        label: format!("{}-b", config.label),
        ..config
    };
    (
        PeerSession::open_with_config(left, left_config),
        PeerSession::open_with_config(right, right_config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;

    #[test]
    fn pair_is_connected_both_ways() {
        let (mut a, mut b) = open_pair(SessionConfig::default());
        assert_eq!(a.label(), "peer-a");
        assert_eq!(b.label(), "peer-b");

        a.send(b"left").unwrap();
        b.send(b"right").unwrap();
        assert_eq!(b.receive().unwrap().as_ref(), b"left");
        assert_eq!(a.receive().unwrap().as_ref(), b"right");
    }

    #[test]
    fn pair_sessions_fail_independently() {
        let (mut a, b) = open_pair(SessionConfig::default());
        drop(b);

        assert!(a.send(b"into the void").unwrap_err().is_fatal());
        assert_eq!(a.state(), SessionState::Failed);
    }
}
