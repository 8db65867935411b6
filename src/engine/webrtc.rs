//! Media engine backed by the `webrtc` crate
//!
//! Wraps one `RTCPeerConnection` per session and maps the negotiator's
//! directives onto it. Candidate payloads keep the browser JSON shape
//! (`candidate`, `sdpMid`, `sdpMLineIndex`, `usernameFragment`) so the two
//! ends interoperate regardless of which side runs in a browser.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine as RtcMediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::{EngineError, EngineEvent, MediaEngine, TrackInfo};
use crate::negotiation::{Candidate, Description, DescriptionKind};

/// Production media engine over an `RTCPeerConnection`
pub struct WebRtcEngine {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcEngine {
    /// Create a peer connection configured with the given STUN servers
    pub async fn new(stun_servers: Vec<String>, candidate_pool_size: u8) -> Result<Self, EngineError> {
        let mut m = RtcMediaEngine::default();
        m.register_default_codecs()
            .map_err(|e| EngineError::Setup(e.to_string()))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut m)
            .map_err(|e| EngineError::Setup(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        let config = RTCConfiguration {
            ice_servers,
            ice_candidate_pool_size: candidate_pool_size,
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(config)
                .await
                .map_err(|e| EngineError::Setup(e.to_string()))?,
        );

        Ok(Self { pc })
    }

    /// Attach a locally acquired media track
    ///
    /// Track acquisition itself lives outside this crate; callers hand the
    /// track over before negotiation starts so it is covered by the offer.
    pub async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<(), EngineError> {
        self.pc
            .add_track(track)
            .await
            .map_err(|e| EngineError::Setup(e.to_string()))?;
        Ok(())
    }

    fn to_rtc_description(desc: &Description) -> Result<RTCSessionDescription, EngineError> {
        let result = match desc.kind {
            DescriptionKind::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
            DescriptionKind::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
        };
        result.map_err(|e| EngineError::DescriptionRejected(e.to_string()))
    }
}

#[async_trait]
impl MediaEngine for WebRtcEngine {
    async fn create_offer(&self) -> Result<Description, EngineError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| EngineError::CreateDescription(e.to_string()))?;
        Ok(Description::offer(offer.sdp))
    }

    async fn create_answer(&self, remote_offer: &Description) -> Result<Description, EngineError> {
        if remote_offer.kind != DescriptionKind::Offer {
            return Err(EngineError::CreateDescription(
                "remote description is not an offer".to_string(),
            ));
        }
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| EngineError::CreateDescription(e.to_string()))?;
        Ok(Description::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: &Description) -> Result<(), EngineError> {
        let rtc_desc = Self::to_rtc_description(desc)?;
        self.pc
            .set_local_description(rtc_desc)
            .await
            .map_err(|e| EngineError::DescriptionRejected(e.to_string()))
    }

    async fn set_remote_description(&self, desc: &Description) -> Result<(), EngineError> {
        let rtc_desc = Self::to_rtc_description(desc)?;
        self.pc
            .set_remote_description(rtc_desc)
            .await
            .map_err(|e| EngineError::DescriptionRejected(e.to_string()))
    }

    async fn add_remote_candidate(&self, candidate: &Candidate) -> Result<(), EngineError> {
        let candidate_str = candidate
            .0
            .get("candidate")
            .and_then(|c| c.as_str())
            .unwrap_or("");

        // An empty candidate string marks end-of-candidates
        if candidate_str.is_empty() {
            debug!("skipping end-of-candidates marker");
            return Ok(());
        }

        let init = RTCIceCandidateInit {
            candidate: candidate_str.to_string(),
            sdp_mid: candidate
                .0
                .get("sdpMid")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string()),
            sdp_mline_index: candidate
                .0
                .get("sdpMLineIndex")
                .and_then(|i| i.as_u64())
                .map(|i| i as u16),
            username_fragment: candidate
                .0
                .get("usernameFragment")
                .and_then(|u| u.as_str())
                .map(|s| s.to_string()),
        };

        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| EngineError::CandidateRejected(e.to_string()))
    }

    async fn subscribe(&self, events: mpsc::Sender<EngineEvent>) -> Result<(), EngineError> {
        let candidate_tx = events.clone();
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let candidate_tx = candidate_tx.clone();
                Box::pin(async move {
                    if let Some(c) = candidate {
                        match c.to_json() {
                            Ok(init) => {
                                let value = serde_json::to_value(&init).unwrap_or_default();
                                let _ = candidate_tx
                                    .send(EngineEvent::LocalCandidate(Candidate(value)))
                                    .await;
                            }
                            Err(e) => warn!("Failed to serialize local candidate: {}", e),
                        }
                    }
                })
            }));

        let track_tx = events.clone();
        self.pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let track_tx = track_tx.clone();
                Box::pin(async move {
                    let info = TrackInfo {
                        id: track.id(),
                        kind: track.kind().to_string(),
                    };
                    info!("Remote track arrived: {} ({})", info.id, info.kind);
                    let _ = track_tx.send(EngineEvent::RemoteTrack(info)).await;
                })
            },
        ));

        let state_tx = events;
        self.pc
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                let state_tx = state_tx.clone();
                Box::pin(async move {
                    debug!("Peer connection state: {:?}", state);
                    match state {
                        RTCPeerConnectionState::Connected => {
                            let _ = state_tx.send(EngineEvent::Connected).await;
                        }
                        RTCPeerConnectionState::Failed => {
                            let _ = state_tx
                                .send(EngineEvent::Failed("transport reported failed".to_string()))
                                .await;
                        }
                        _ => {}
                    }
                })
            }));

        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.pc
            .close()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offer_creation_offline() -> Result<(), EngineError> {
        // Offer creation needs no network; gathering starts lazily
        let engine = WebRtcEngine::new(vec![], 0).await?;
        let offer = engine.create_offer().await?;

        assert_eq!(offer.kind, DescriptionKind::Offer);
        assert!(offer.sdp.starts_with("v=0"));

        engine.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_answer_requires_offer_kind() {
        let engine = WebRtcEngine::new(vec![], 0).await.unwrap();
        let not_an_offer = Description::answer("v=0\r\n");

        let result = engine.create_answer(&not_an_offer).await;
        assert!(result.is_err());

        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_end_of_candidates_marker_skipped() {
        let engine = WebRtcEngine::new(vec![], 0).await.unwrap();
        let marker = Candidate(serde_json::json!({"candidate": ""}));

        // Accepted without a remote description because nothing is applied
        engine.add_remote_candidate(&marker).await.unwrap();

        engine.close().await.unwrap();
    }
}
