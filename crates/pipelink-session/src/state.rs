//! Session lifecycle.
//!
//! States: Connecting → Established → Draining → Closed, or Failed from any
//! non-terminal state. `Closed` and `Failed` are terminal.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::debug;

/// Session state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// Channel attached, nothing exchanged yet.
    Connecting = 0,
    /// Messages may flow in both directions.
    Established = 1,
    /// One direction has been closed locally, the other is still open.
    Draining = 2,
    /// Both directions have ended. Final state.
    Closed = 3,
    /// An I/O or framing fault ended the session. Final state.
    Failed = 4,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Lowercase name, as used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Established => "established",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Connecting,
            1 => SessionState::Established,
            2 => SessionState::Draining,
            3 => SessionState::Closed,
            _ => SessionState::Failed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Shared {
    raw: AtomicU8,
    // Guards nothing; pairs with `changed` so waiters cannot miss a transition.
    lock: Mutex<()>,
    changed: Condvar,
}

/// State shared by the send and receive halves of one session.
///
/// Each half only ever touches its own direction of the channel; this cell
/// is the one thing they have in common.
#[derive(Clone)]
pub(crate) struct StateCell {
    shared: Arc<Shared>,
    label: Arc<str>,
}

impl StateCell {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            shared: Arc::new(Shared {
                raw: AtomicU8::new(SessionState::Connecting as u8),
                lock: Mutex::new(()),
                changed: Condvar::new(),
            }),
            label: Arc::from(label),
        }
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.shared.raw.load(Ordering::Acquire))
    }

    /// Block while the session is still `Connecting`; returns the state it left for.
    pub(crate) fn wait_while_connecting(&self) -> SessionState {
        let mut guard = self
            .shared
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            let state = self.get();
            if state != SessionState::Connecting {
                return state;
            }
            guard = self
                .shared
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// `Connecting -> Established`; no-op from any other state.
    pub(crate) fn establish(&self) -> SessionState {
        self.transition(|state| match state {
            SessionState::Connecting => Some(SessionState::Established),
            _ => None,
        })
    }

    /// One direction closed locally: `Draining` first, `Closed` on the second.
    pub(crate) fn half_close(&self) -> SessionState {
        self.transition(|state| match state {
            SessionState::Connecting | SessionState::Established => Some(SessionState::Draining),
            SessionState::Draining => Some(SessionState::Closed),
            SessionState::Closed | SessionState::Failed => None,
        })
    }

    /// Both directions ended. A failed session stays failed.
    pub(crate) fn close(&self) -> SessionState {
        self.transition(|state| match state {
            SessionState::Closed | SessionState::Failed => None,
            _ => Some(SessionState::Closed),
        })
    }

    /// Fault on either direction. Terminal states are left alone.
    pub(crate) fn fail(&self) -> SessionState {
        self.transition(|state| {
            if state.is_terminal() {
                None
            } else {
                Some(SessionState::Failed)
            }
        })
    }

    fn transition(&self, next: impl Fn(SessionState) -> Option<SessionState>) -> SessionState {
        let mut current = self.shared.raw.load(Ordering::Acquire);
        loop {
            let from = SessionState::from_u8(current);
            let Some(to) = next(from) else {
                return from;
            };
            match self.shared.raw.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(session = %self.label, %from, %to, "session state changed");
                    let _guard = self
                        .shared
                        .lock
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    self.shared.changed.notify_all();
                    return to;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("label", &self.label)
            .field("state", &self.get())
            .finish()
    }
}
