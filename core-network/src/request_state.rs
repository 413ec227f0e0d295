//! Request lifecycle state machine
//!
//! ```text
//! Initialized ──> Resumed ──> Finished
//!      │             │
//!      └─────────────┴──────> Cancelled
//! ```
//!
//! `Finished` and `Cancelled` are terminal. A resumed request cannot be
//! resumed again or reset to `Initialized`.

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RequestState {
    #[default]
    Initialized,
    Resumed,
    Finished,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Finished | RequestState::Cancelled)
    }

    pub fn can_transition_to(self, next: RequestState) -> bool {
        match (self, next) {
            (RequestState::Finished | RequestState::Cancelled, _) => false,
            (RequestState::Initialized, _) => true,
            (RequestState::Resumed, RequestState::Finished | RequestState::Cancelled) => true,
            (RequestState::Resumed, RequestState::Resumed | RequestState::Initialized) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Initialized => "initialized",
            RequestState::Resumed => "resumed",
            RequestState::Finished => "finished",
            RequestState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the state of one request and rejects illegal transitions.
#[derive(Debug, Clone, Default)]
pub struct RequestLifecycle {
    state: RequestState,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn transition(&mut self, next: RequestState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(NetworkError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
