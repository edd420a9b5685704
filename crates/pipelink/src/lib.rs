//! Framed peer sessions over pipes, FIFOs and sockets.
//!
//! Two independently started processes, each holding one end of a pair of
//! byte streams, exchange whole, ordered messages and can tell a peer that
//! went away cleanly from one that broke.
//!
//! # Crate Structure
//!
//! - [`transport`] — Blocking duplex byte channels (in-memory pipes, FIFOs, sockets)
//! - [`frame`] — 4-byte big-endian length-prefixed framing
//! - [`session`] — Peer session lifecycle and send/receive contract

/// Re-export transport types.
pub mod transport {
    pub use pipelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pipelink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use pipelink_session::*;
}
