//! Per-session negotiation state
//!
//! One `Session` tracks one negotiation between two endpoints: the role this
//! side committed to, the description pair, and candidates received before
//! the remote description existed. The negotiator owns it exclusively.

use tracing::debug;

use super::types::{Candidate, Description, NegotiationState, Role};
use crate::engine::TrackInfo;

pub struct Session {
    local_id: String,
    role: Role,
    state: NegotiationState,
    local_description: Option<Description>,
    remote_description: Option<Description>,
    pending_remote: Vec<Candidate>,
    remote_tracks: Vec<TrackInfo>,
}

/// Point-in-time view of a session, published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub role: Role,
    pub state: NegotiationState,
    pub remote_tracks: usize,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            role: Role::Unset,
            state: NegotiationState::Idle,
            remote_tracks: 0,
        }
    }
}

impl Session {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            role: Role::Unset,
            state: NegotiationState::Idle,
            local_description: None,
            remote_description: None,
            pending_remote: Vec::new(),
            remote_tracks: Vec::new(),
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            role: self.role,
            state: self.state,
            remote_tracks: self.remote_tracks.len(),
        }
    }

    pub fn set_state(&mut self, next: NegotiationState) {
        if self.state != next {
            debug!("session {}: {} -> {}", self.local_id, self.state, next);
            self.state = next;
        }
    }

    /// Commit to a role. The caller has already checked the role is unset.
    pub fn assign_role(&mut self, role: Role) {
        debug_assert_eq!(self.role, Role::Unset);
        debug!("session {}: role {}", self.local_id, role);
        self.role = role;
    }

    pub fn local_description(&self) -> Option<&Description> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&Description> {
        self.remote_description.as_ref()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description.is_some()
    }

    /// Whether a description matches the stored remote one byte for byte
    pub fn remote_matches(&self, desc: &Description) -> bool {
        self.remote_description.as_ref() == Some(desc)
    }

    pub fn record_local_description(&mut self, desc: Description) {
        self.local_description = Some(desc);
    }

    /// Store the remote description and hand back the candidates buffered
    /// while it was missing, in arrival order.
    pub fn record_remote_description(&mut self, desc: Description) -> Vec<Candidate> {
        debug_assert!(self.remote_description.is_none());
        self.remote_description = Some(desc);
        std::mem::take(&mut self.pending_remote)
    }

    /// Buffer candidates that arrived before the remote description
    pub fn buffer_remote_candidates(&mut self, candidates: Vec<Candidate>) {
        self.pending_remote.extend(candidates);
    }

    pub fn record_remote_track(&mut self, track: TrackInfo) {
        self.remote_tracks.push(track);
    }

    pub fn remote_tracks(&self) -> &[TrackInfo] {
        &self.remote_tracks
    }
}
