//! Media engine contract consumed by the negotiator
//!
//! The engine owns the actual transport session: it produces and applies
//! session descriptions, accepts remote candidates, and reports local
//! candidate discovery, remote tracks and connection state back to its
//! session. The negotiator depends only on this contract.

mod webrtc;

pub use self::webrtc::WebRtcEngine;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::negotiation::{Candidate, Description};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to create description: {0}")]
    CreateDescription(String),

    #[error("description rejected: {0}")]
    DescriptionRejected(String),

    #[error("candidate rejected: {0}")]
    CandidateRejected(String),

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("engine setup failed: {0}")]
    Setup(String),
}

/// Remote media track reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: String,
}

/// Events the engine reports back to its session
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A local reachability candidate was discovered
    LocalCandidate(Candidate),
    /// A remote media track started arriving
    RemoteTrack(TrackInfo),
    /// The transport reached the connected state
    Connected,
    /// The transport failed after setup
    Failed(String),
}

/// Transport session capable of producing and consuming descriptions
///
/// One engine instance belongs to exactly one session. All methods may
/// suspend; the negotiator serializes calls per session.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Create the local offer description
    async fn create_offer(&self) -> Result<Description, EngineError>;

    /// Create the local answer to a remote offer
    ///
    /// The remote offer has already been applied via
    /// [`set_remote_description`](Self::set_remote_description).
    async fn create_answer(&self, remote_offer: &Description) -> Result<Description, EngineError>;

    async fn set_local_description(&self, desc: &Description) -> Result<(), EngineError>;

    async fn set_remote_description(&self, desc: &Description) -> Result<(), EngineError>;

    async fn add_remote_candidate(&self, candidate: &Candidate) -> Result<(), EngineError>;

    /// Register the session's event subscription
    ///
    /// Called exactly once per session, before any other method.
    async fn subscribe(&self, events: mpsc::Sender<EngineEvent>) -> Result<(), EngineError>;

    /// Tear down the transport session
    async fn close(&self) -> Result<(), EngineError>;
}
