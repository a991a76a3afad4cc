//! Per-connection session record and lifecycle state.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

/// Lifecycle state of a proxied session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport accepted, identity not yet verified.
    Connecting,
    /// Waiting for the client's setup frame.
    AwaitingSetup,
    /// All pumps running.
    Active,
    /// Teardown in progress.
    Closing,
    /// Everything released.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "Connecting",
            SessionState::AwaitingSetup => "AwaitingSetup",
            SessionState::Active => "Active",
            SessionState::Closing => "Closing",
            SessionState::Closed => "Closed",
        };
        write!(f, "{name}")
    }
}

/// One proxied conversation, owned exclusively by its supervisor task.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub uid: String,
    pub created_at: Instant,
    /// Wall-clock budget for the whole Active phase.
    pub deadline: Duration,
    state: SessionState,
}

impl Session {
    pub fn new(uid: impl Into<String>, deadline: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid: uid.into(),
            created_at: Instant::now(),
            deadline,
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to the next lifecycle state. Re-entering the current state is a
    /// no-op so teardown paths can be invoked twice safely.
    pub fn advance(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug!(session = %self.id, uid = %self.uid, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}
