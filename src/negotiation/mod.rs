//! Relay-mediated connection negotiation
//!
//! Two endpoints that cannot address each other exchange session
//! descriptions and reachability candidates through a relay:
//! - Message types: requestOffer, offerResponse, requestAnswer,
//!   answerResponse, answered, iceCandidate, remoteIceCandidates
//! - Roles: the first disambiguating trigger commits a session to
//!   Offerer or Answerer, exactly once
//! - Candidates arriving before the remote description are buffered and
//!   applied in order once it exists

mod channel;
mod error;
mod negotiator;
mod pool;
mod session;
mod types;

#[cfg(test)]
mod tests;

pub use channel::{ChannelEvent, ChannelHandle, SignalingChannel};
pub use error::{NegotiationError, Result};
pub use negotiator::{Negotiator, NegotiatorHandle};
pub use pool::{SessionPool, SessionStatus};
pub use session::{Session, SessionSnapshot};
pub use types::{
    Candidate, CandidateBatch, Description, DescriptionKind, Frame, NegotiationState, Role,
    SignalingMessage,
};
