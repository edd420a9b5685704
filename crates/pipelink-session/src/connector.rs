use std::fs::File;
use std::os::unix::net::UnixStream;
use std::path::Path;

use pipelink_transport::{open_fifo_pair, ByteChannel};
use tracing::info;

use crate::error::Result;
use crate::session::{PeerSession, SessionConfig};

/// A session whose directions are two named pipes.
pub type FifoSession = PeerSession<File, File>;

/// Open a session reading from `input` and writing to `output` (two FIFOs).
pub fn connect_fifo(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<FifoSession> {
    connect_fifo_with_config(input, output, SessionConfig::default())
}

/// Open a FIFO session with explicit configuration.
///
/// Blocks until the peer has opened the other ends of both pipes.
pub fn connect_fifo_with_config(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: SessionConfig,
) -> Result<FifoSession> {
    let channel = open_fifo_pair(input.as_ref(), output.as_ref())?;
    info!(
        session = %config.label,
        input = ?input.as_ref(),
        output = ?output.as_ref(),
        "fifo session connected"
    );
    Ok(PeerSession::open_with_config(channel, config))
}

/// Open a session over a connected Unix socket.
pub fn from_unix_stream(
    stream: UnixStream,
    config: SessionConfig,
) -> Result<PeerSession<UnixStream, UnixStream>> {
    let channel = ByteChannel::from_unix_stream(stream)?;
    Ok(PeerSession::open_with_config(channel, config))
}
