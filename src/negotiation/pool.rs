//! Session registry
//!
//! Explicit map from session id to negotiation state, so one process can run
//! several negotiations at once, each with its own engine and relay channel.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::negotiator::NegotiatorHandle;
use super::types::{NegotiationState, Role};

/// Status row for one registered session
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub local_id: String,
    pub role: Role,
    pub state: NegotiationState,
    pub remote_tracks: usize,
}

#[derive(Default)]
pub struct SessionPool {
    sessions: RwLock<HashMap<String, NegotiatorHandle>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: NegotiatorHandle) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(handle.local_id().to_string(), handle);
    }

    pub async fn get(&self, local_id: &str) -> Option<NegotiatorHandle> {
        self.sessions.read().await.get(local_id).cloned()
    }

    /// Drop a session from the registry, closing its negotiator
    pub async fn remove(&self, local_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(local_id) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn statuses(&self) -> Vec<SessionStatus> {
        self.sessions
            .read()
            .await
            .values()
            .map(|handle| {
                let snapshot = handle.snapshot();
                SessionStatus {
                    local_id: handle.local_id().to_string(),
                    role: snapshot.role,
                    state: snapshot.state,
                    remote_tracks: snapshot.remote_tracks,
                }
            })
            .collect()
    }

    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        for handle in sessions.values() {
            handle.close();
        }
        sessions.clear();
    }
}
