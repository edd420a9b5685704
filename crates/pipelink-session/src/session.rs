use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use bytes::Bytes;
use pipelink_frame::{
    Frame, FrameConfig, FrameReader, FrameWriter, Framer, Result as FrameResult,
};
use pipelink_transport::ByteChannel;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::state::{SessionState, StateCell};

/// Configuration for a peer session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Framing limits.
    pub frame: FrameConfig,
    /// Stay in `Connecting` until the first frame arrives.
    ///
    /// Leave this off when the layer above needs no handshake: the session is
    /// then established as soon as it is opened.
    pub await_first_frame: bool,
    /// Name used in log output.
    pub label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            await_first_frame: false,
            label: "peer".to_string(),
        }
    }
}

/// One side of a message link to a single peer.
///
/// No retries happen at this layer: any I/O or framing fault moves the
/// session to [`SessionState::Failed`] for good. Reconnecting means opening a
/// fresh session.
pub struct PeerSession<R, W> {
    framer: Framer<R, W>,
    state: StateCell,
}

impl<R: Read, W: Write> PeerSession<R, W> {
    /// Open a session over a channel with default configuration.
    pub fn open(channel: ByteChannel<R, W>) -> Self {
        Self::open_with_config(channel, SessionConfig::default())
    }

    /// Open a session over a channel with explicit configuration.
    pub fn open_with_config(channel: ByteChannel<R, W>, config: SessionConfig) -> Self {
        let framer = Framer::with_config(channel, config.frame);
        let state = StateCell::new(&config.label);
        debug!(session = %state.label(), "session opened");
        if !config.await_first_frame {
            state.establish();
        }
        Self { framer, state }
    }

    /// Send one message.
    ///
    /// Fails with [`SessionError::NotEstablished`] while still connecting. Any
    /// framing or I/O fault fails the session and releases the channel.
    pub fn send(&mut self, message: &[u8]) -> Result<()> {
        let closed = self.framer.is_closed();
        let result = send_on(&self.state, closed, || self.framer.send(message));
        if matches!(result, Err(SessionError::Fatal(_))) {
            self.release();
        }
        result
    }

    /// Receive the next message (blocking).
    ///
    /// Returns [`SessionError::PeerClosed`] once the peer has shut down
    /// cleanly; the session is then `Closed`.
    pub fn receive(&mut self) -> Result<Bytes> {
        let closed = self.framer.is_closed();
        let result = receive_on(&self.state, closed, || self.framer.receive());
        if matches!(
            result,
            Err(SessionError::Fatal(_)) | Err(SessionError::PeerClosed)
        ) {
            self.release();
        }
        result
    }

    /// Close both directions and release the channel. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        match self.framer.close() {
            Ok(()) => {
                if self.state.close() == SessionState::Closed {
                    debug!(session = %self.state.label(), "session closed");
                }
                Ok(())
            }
            Err(err) => {
                self.state.fail();
                warn!(session = %self.state.label(), error = %err, "session failed on close");
                Err(SessionError::Fatal(err))
            }
        }
    }

    fn release(&mut self) {
        if let Err(err) = self.framer.close() {
            debug!(session = %self.state.label(), error = %err, "flush on release failed");
        }
    }
}

impl<R, W> PeerSession<R, W> {
    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether the link is still usable in at least one direction.
    pub fn is_open(&self) -> bool {
        !self.state.get().is_terminal()
    }

    /// Declare the session established after a handshake run by the caller.
    pub fn mark_established(&self) -> Result<()> {
        match self.state.establish() {
            state if state.is_terminal() => Err(SessionError::Terminated { state }),
            _ => Ok(()),
        }
    }

    /// Label used in log output.
    pub fn label(&self) -> &str {
        self.state.label()
    }

    /// Framing limits in effect for both directions.
    pub fn frame_config(&self) -> &FrameConfig {
        self.framer.config()
    }

    /// Separate the session into halves that can run on different threads.
    ///
    /// Both halves keep reporting the same lifecycle state. The output
    /// direction is shared so that whichever half ends the session also
    /// releases it, and the peer sees end of stream.
    pub fn split(self) -> (SessionReceiver<R, W>, SessionSender<W>) {
        let (reader, writer) = self.framer.split();
        let writer = Arc::new(Mutex::new(writer));
        (
            SessionReceiver {
                reader,
                output: Arc::clone(&writer),
                state: self.state.clone(),
            },
            SessionSender {
                writer,
                state: self.state,
            },
        )
    }
}

impl<R, W> std::fmt::Debug for PeerSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("label", &self.state.label())
            .field("state", &self.state.get())
            .field("buffered", &self.framer.buffered())
            .finish()
    }
}

/// Sending half of a split [`PeerSession`].
pub struct SessionSender<W> {
    writer: Arc<Mutex<FrameWriter<W>>>,
    state: StateCell,
}

impl<W: Write> SessionSender<W> {
    /// Send one message. See [`PeerSession::send`].
    ///
    /// Once the session is over, from either half, the output is released
    /// here before returning.
    pub fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut writer = lock_writer(&self.writer);
        let closed = writer.is_closed();
        let result = send_on(&self.state, closed, || writer.send(message));
        if self.state.get().is_terminal() {
            close_output(&mut writer, &self.state);
        }
        result
    }

    /// Close the sending direction. Idempotent.
    ///
    /// The peer sees end of stream; this side may keep receiving until the
    /// peer closes too. The session is `Draining` until then.
    pub fn close(&mut self) -> Result<()> {
        let mut writer = lock_writer(&self.writer);
        if writer.is_closed() {
            return Ok(());
        }
        let flushed = writer.close();
        self.state.half_close();
        flushed.map_err(|err| {
            self.state.fail();
            SessionError::Fatal(err)
        })
    }
}

impl<W> SessionSender<W> {
    /// Current lifecycle state of the whole session.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Block until the session leaves `Connecting`.
    ///
    /// Fails with [`SessionError::Terminated`] if it ended instead of being
    /// established.
    pub fn wait_established(&self) -> Result<()> {
        match self.state.wait_while_connecting() {
            state if state.is_terminal() => Err(SessionError::Terminated { state }),
            _ => Ok(()),
        }
    }
}

/// Receiving half of a split [`PeerSession`].
pub struct SessionReceiver<R, W> {
    reader: FrameReader<R>,
    output: Arc<Mutex<FrameWriter<W>>>,
    state: StateCell,
}

impl<R: Read, W: Write> SessionReceiver<R, W> {
    /// Receive the next message (blocking). See [`PeerSession::receive`].
    ///
    /// When this ends the session the output direction is released too, so
    /// the peer is not left waiting on a link nobody will write to again.
    pub fn receive(&mut self) -> Result<Bytes> {
        let closed = self.reader.is_closed();
        let result = receive_on(&self.state, closed, || self.reader.read_frame());
        if result.is_err() {
            self.reader.close();
        }
        if self.state.get().is_terminal() {
            self.release_output();
        }
        result
    }

    fn release_output(&self) {
        match self.output.try_lock() {
            Ok(mut writer) => close_output(&mut writer, &self.state),
            Err(TryLockError::Poisoned(poisoned)) => {
                close_output(&mut poisoned.into_inner(), &self.state)
            }
            // Mid-send: the sender releases it when that write returns.
            Err(TryLockError::WouldBlock) => {}
        }
    }
}

impl<R, W> SessionReceiver<R, W> {
    /// Stop receiving. Idempotent.
    pub fn close(&mut self) {
        if self.reader.is_closed() {
            return;
        }
        self.reader.close();
        self.state.half_close();
    }

    /// Current lifecycle state of the whole session.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }
}

fn lock_writer<W>(writer: &Mutex<FrameWriter<W>>) -> MutexGuard<'_, FrameWriter<W>> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn close_output<W: Write>(writer: &mut FrameWriter<W>, state: &StateCell) {
    if let Err(err) = writer.close() {
        debug!(session = %state.label(), error = %err, "flush on release failed");
    }
}

fn send_on(
    state: &StateCell,
    closed: bool,
    send: impl FnOnce() -> FrameResult<()>,
) -> Result<()> {
    match state.get() {
        current if current.is_terminal() || closed => {
            return Err(SessionError::Terminated { state: current })
        }
        SessionState::Connecting => {
            return Err(SessionError::NotEstablished {
                state: SessionState::Connecting,
            })
        }
        _ => {}
    }

    send().map_err(|err| {
        state.fail();
        warn!(session = %state.label(), error = %err, "send failed");
        SessionError::Fatal(err)
    })
}

fn receive_on(
    state: &StateCell,
    closed: bool,
    receive: impl FnOnce() -> FrameResult<Option<Frame>>,
) -> Result<Bytes> {
    let current = state.get();
    if current.is_terminal() || closed {
        return Err(SessionError::Terminated { state: current });
    }

    match receive() {
        Ok(Some(frame)) => {
            state.establish();
            Ok(frame.into_payload())
        }
        Ok(None) => {
            state.close();
            info!(session = %state.label(), "peer closed");
            Err(SessionError::PeerClosed)
        }
        Err(err) => {
            state.fail();
            warn!(session = %state.label(), error = %err, "receive failed");
            Err(SessionError::Fatal(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use pipelink_frame::FrameError;
    use pipelink_transport::{duplex, DEFAULT_PIPE_CAPACITY};

    use super::*;

    fn awaiting() -> SessionConfig {
        SessionConfig {
            await_first_frame: true,
            ..SessionConfig::default()
        }
    }

    fn small_frames() -> SessionConfig {
        SessionConfig {
            frame: FrameConfig {
                max_frame_size: 4,
                ..FrameConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    #[test]
    fn established_on_open_without_handshake() {
        let (a, _b) = duplex(DEFAULT_PIPE_CAPACITY);
        let session = PeerSession::open(a);
        assert_eq!(session.state(), SessionState::Established);
        assert!(session.is_open());
        assert_eq!(session.label(), "peer");
    }

    #[test]
    fn send_before_established_is_rejected() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let mut a = PeerSession::open_with_config(a, awaiting());
        let mut b = PeerSession::open(b);

        assert_eq!(a.state(), SessionState::Connecting);
        assert!(matches!(
            a.send(b"too early"),
            Err(SessionError::NotEstablished {
                state: SessionState::Connecting
            })
        ));
        assert_eq!(a.state(), SessionState::Connecting);

        b.send(b"hello").unwrap();
        assert_eq!(a.receive().unwrap().as_ref(), b"hello");
        assert_eq!(a.state(), SessionState::Established);
        a.send(b"now").unwrap();
        assert_eq!(b.receive().unwrap().as_ref(), b"now");
    }

    #[test]
    fn mark_established_after_external_handshake() {
        let (a, _b) = duplex(DEFAULT_PIPE_CAPACITY);
        let session = PeerSession::open_with_config(a, awaiting());
        session.mark_established().unwrap();
        assert_eq!(session.state(), SessionState::Established);
    }

    #[test]
    fn peer_close_is_clean() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let mut a = PeerSession::open(a);
        let mut b = PeerSession::open(b);

        a.close().unwrap();
        let err = b.receive().unwrap_err();
        assert!(err.is_peer_closed());
        assert!(!err.is_fatal());
        assert_eq!(b.state(), SessionState::Closed);

        assert!(matches!(
            b.receive(),
            Err(SessionError::Terminated {
                state: SessionState::Closed
            })
        ));
        assert!(matches!(
            b.send(b"late"),
            Err(SessionError::Terminated {
                state: SessionState::Closed
            })
        ));
    }

    #[test]
    fn truncated_stream_fails_session() {
        let mut wire = BytesMut::new();
        wire.put_u32(10);
        wire.put_slice(b"half");
        let channel = ByteChannel::new(Cursor::new(wire.to_vec()), Vec::<u8>::new());
        let mut session = PeerSession::open(channel);

        let err = session.receive().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Fatal(FrameError::TruncatedStream { buffered: 8 })
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.is_open());
        assert!(matches!(
            session.send(b"x"),
            Err(SessionError::Terminated {
                state: SessionState::Failed
            })
        ));
    }

    #[test]
    fn corrupt_length_fails_session() {
        let mut wire = BytesMut::new();
        wire.put_u32(u32::MAX);
        let channel = ByteChannel::new(Cursor::new(wire.to_vec()), Vec::<u8>::new());
        let mut session = PeerSession::open(channel);

        assert!(matches!(
            session.receive(),
            Err(SessionError::Fatal(FrameError::TooLarge { .. }))
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn oversized_send_fails_session() {
        let config = SessionConfig {
            frame: FrameConfig {
                max_frame_size: 4,
                ..FrameConfig::default()
            },
            ..SessionConfig::default()
        };
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let mut a = PeerSession::open_with_config(a, config);
        let mut b = PeerSession::open(b);

        assert!(matches!(
            a.send(b"too big"),
            Err(SessionError::Fatal(FrameError::TooLarge { size: 7, max: 4 }))
        ));
        assert_eq!(a.state(), SessionState::Failed);
        // Nothing partial reached the peer; it only sees the channel go away.
        assert!(b.receive().unwrap_err().is_peer_closed());
    }

    #[test]
    fn close_is_idempotent() {
        let (a, _b) = duplex(DEFAULT_PIPE_CAPACITY);
        let mut session = PeerSession::open(a);
        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn split_halves_drain_then_close() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let (mut a_rx, mut a_tx) = PeerSession::open(a).split();
        let mut b = PeerSession::open(b);

        a_tx.send(b"last words").unwrap();
        a_tx.close().unwrap();
        a_tx.close().unwrap();
        assert_eq!(a_rx.state(), SessionState::Draining);
        assert!(matches!(
            a_tx.send(b"more"),
            Err(SessionError::Terminated {
                state: SessionState::Draining
            })
        ));

        assert_eq!(b.receive().unwrap().as_ref(), b"last words");
        b.send(b"reply").unwrap();
        assert_eq!(a_rx.receive().unwrap().as_ref(), b"reply");

        a_rx.close();
        assert_eq!(a_tx.state(), SessionState::Closed);
        assert!(b.receive().unwrap_err().is_peer_closed());
    }

    #[test]
    fn split_receiver_sees_peer_close() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let (mut a_rx, a_tx) = PeerSession::open(a).split();
        let mut b = PeerSession::open(b);

        b.close().unwrap();
        assert!(a_rx.receive().unwrap_err().is_peer_closed());
        assert_eq!(a_tx.state(), SessionState::Closed);
    }

    #[test]
    fn split_receiver_failure_releases_output() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let (mut a_rx, mut a_tx) = PeerSession::open_with_config(a, small_frames()).split();
        let mut b = PeerSession::open(b);

        b.send(b"oversized").unwrap();
        assert!(a_rx.receive().unwrap_err().is_fatal());
        assert_eq!(a_tx.state(), SessionState::Failed);

        // The sender still exists, yet the peer already sees the link end.
        assert!(b.receive().unwrap_err().is_peer_closed());
        assert!(matches!(
            a_tx.send(b"late"),
            Err(SessionError::Terminated {
                state: SessionState::Failed
            })
        ));
        a_tx.close().unwrap();
    }

    #[test]
    fn sender_waits_for_establishment() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let (mut a_rx, a_tx) = PeerSession::open_with_config(a, awaiting()).split();
        let mut b = PeerSession::open(b);

        let waiter = std::thread::spawn(move || a_tx.wait_established().map(|()| a_tx));
        b.send(b"hello").unwrap();
        assert_eq!(a_rx.receive().unwrap().as_ref(), b"hello");

        let mut a_tx = waiter.join().unwrap().unwrap();
        a_tx.send(b"hi").unwrap();
        assert_eq!(b.receive().unwrap().as_ref(), b"hi");
    }

    #[test]
    fn wait_established_reports_peer_gone() {
        let (a, b) = duplex(DEFAULT_PIPE_CAPACITY);
        let (mut a_rx, a_tx) = PeerSession::open_with_config(a, awaiting()).split();
        let waiter = std::thread::spawn(move || a_tx.wait_established());

        drop(b);
        assert!(a_rx.receive().unwrap_err().is_peer_closed());
        assert!(matches!(
            waiter.join().unwrap(),
            Err(SessionError::Terminated {
                state: SessionState::Closed
            })
        ));
    }

    #[test]
    fn frame_config_is_exposed() {
        let (a, _b) = duplex(DEFAULT_PIPE_CAPACITY);
        let session = PeerSession::open_with_config(a, small_frames());
        assert_eq!(session.frame_config().max_frame_size, 4);
    }

    #[test]
    fn debug_output_names_session() {
        let (a, _b) = duplex(DEFAULT_PIPE_CAPACITY);
        let session = PeerSession::open_with_config(
            a,
            SessionConfig {
                label: "left".to_string(),
                ..SessionConfig::default()
            },
        );
        let debug = format!("{session:?}");
        assert!(debug.contains("left"));
        assert!(debug.contains("Established"));
    }
}
