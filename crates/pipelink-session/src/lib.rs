//! Peer session lifecycle over framed duplex byte channels.
//!
//! A [`PeerSession`] is one side's view of a link to exactly one peer. It
//! sends and receives whole messages, tracks the link through
//! `Connecting -> Established -> Draining -> Closed` (or `Failed`), and tells
//! a clean peer shutdown apart from a fault.
//!
//! Sessions share nothing in-process with their peer: two sessions talk only
//! through the byte channel between them, so each side may live in its own
//! process and fail independently.

pub mod error;
pub mod pair;
pub mod session;
pub mod state;

#[cfg(unix)]
pub mod connector;

pub use error::{Result, SessionError};
pub use pair::{open_pair, open_pair_with_capacity, MemorySession};
pub use session::{PeerSession, SessionConfig, SessionReceiver, SessionSender};
pub use state::SessionState;

#[cfg(unix)]
pub use connector::{connect_fifo, connect_fifo_with_config, from_unix_stream, FifoSession};
