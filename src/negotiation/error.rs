//! Error types for negotiation

use thiserror::Error;

use super::types::NegotiationState;
use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("protocol violation in session {session} while {state} (message {message}): {detail}")]
    ProtocolViolation {
        session: String,
        state: NegotiationState,
        message: String,
        detail: String,
    },

    #[error("media engine failure in session {session} while {state}: {source}")]
    MediaEngineFailure {
        session: String,
        state: NegotiationState,
        #[source]
        source: EngineError,
    },

    #[error("channel failure in session {session} while {state}: {detail}")]
    ChannelFailure {
        session: String,
        state: NegotiationState,
        detail: String,
    },
}

impl NegotiationError {
    /// Session id the error belongs to
    pub fn session(&self) -> &str {
        match self {
            NegotiationError::ProtocolViolation { session, .. } => session,
            NegotiationError::MediaEngineFailure { session, .. } => session,
            NegotiationError::ChannelFailure { session, .. } => session,
        }
    }

    /// Session state at the time of failure
    pub fn state(&self) -> NegotiationState {
        match self {
            NegotiationError::ProtocolViolation { state, .. } => *state,
            NegotiationError::MediaEngineFailure { state, .. } => *state,
            NegotiationError::ChannelFailure { state, .. } => *state,
        }
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
