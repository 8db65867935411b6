//! Session negotiator
//!
//! Drives one session: applies inbound relay messages and media engine
//! events strictly one at a time, in arrival order, issuing engine
//! directives and outbound messages as the state machine dictates. Engine
//! calls are awaited inline, so events arriving while one is suspended
//! queue behind it and the description-before-candidates rule holds.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::channel::{ChannelEvent, ChannelHandle};
use super::error::{NegotiationError, Result};
use super::session::{Session, SessionSnapshot};
use super::types::{Candidate, Description, DescriptionKind, NegotiationState, Role, SignalingMessage};
use crate::engine::{EngineError, EngineEvent, MediaEngine};

/// Observer handle for a running negotiator
#[derive(Clone)]
pub struct NegotiatorHandle {
    local_id: String,
    snapshot: watch::Receiver<SessionSnapshot>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl NegotiatorHandle {
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn state(&self) -> NegotiationState {
        self.snapshot.borrow().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.borrow()
    }

    /// Wait until the session reaches the given state
    ///
    /// Returns `false` if the negotiator ended without reaching it.
    pub async fn wait_for(&mut self, target: NegotiationState) -> bool {
        loop {
            if self.snapshot.borrow().state == target {
                return true;
            }
            if self.snapshot.changed().await.is_err() {
                return self.snapshot.borrow().state == target;
            }
        }
    }

    /// Ask the negotiator to stop and release its session
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Negotiator for one session
///
/// Construction requires a completed registration (the `local_id`) and a
/// connected channel, which makes negotiation-before-registration
/// unrepresentable rather than a runtime error.
pub struct Negotiator {
    session: Session,
    engine: Arc<dyn MediaEngine>,
    channel: ChannelHandle,
    channel_rx: mpsc::Receiver<ChannelEvent>,
    engine_rx: mpsc::Receiver<EngineEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Negotiator {
    /// Build a negotiator and register the engine subscription
    pub async fn new(
        local_id: impl Into<String>,
        engine: Arc<dyn MediaEngine>,
        channel: ChannelHandle,
        channel_rx: mpsc::Receiver<ChannelEvent>,
    ) -> Result<(Self, NegotiatorHandle)> {
        let session = Session::new(local_id);

        let (engine_tx, engine_rx) = mpsc::channel(64);
        engine.subscribe(engine_tx).await.map_err(|e| {
            NegotiationError::MediaEngineFailure {
                session: session.local_id().to_string(),
                state: session.state(),
                source: e,
            }
        })?;

        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = NegotiatorHandle {
            local_id: session.local_id().to_string(),
            snapshot: snapshot_rx,
            shutdown: Arc::new(shutdown_tx),
        };

        let negotiator = Self {
            session,
            engine,
            channel,
            channel_rx,
            engine_rx,
            snapshot_tx,
            shutdown_rx,
        };

        Ok((negotiator, handle))
    }

    pub fn local_id(&self) -> &str {
        self.session.local_id()
    }

    /// Run the session to completion
    ///
    /// Returns when the session is closed, the relay disconnects, or an
    /// error fails the session. Errors carry the session id, the state at
    /// failure and the offending message; no retry is attempted here.
    pub async fn run(mut self) -> Result<()> {
        info!("Session {} negotiating", self.session.local_id());

        let result = self.drive().await;
        if let Err(ref e) = result {
            error!("Session {} failed: {}", self.session.local_id(), e);
            self.set_state(NegotiationState::Failed);
        }

        if let Err(e) = self.engine.close().await {
            debug!("Engine close for {}: {}", self.session.local_id(), e);
        }

        result
    }

    async fn drive(&mut self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // A dropped handle counts as a close request
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Session {} closing", self.session.local_id());
                        break;
                    }
                }
                event = self.channel_rx.recv() => match event {
                    Some(ChannelEvent::Message(msg)) => self.handle_message(msg).await?,
                    Some(ChannelEvent::Malformed(detail)) => {
                        return Err(self.protocol_violation("<frame>", detail));
                    }
                    Some(ChannelEvent::Error(detail)) => {
                        return Err(self.channel_failure(detail));
                    }
                    Some(ChannelEvent::Closed) | None => {
                        info!("Session {} relay disconnected", self.session.local_id());
                        break;
                    }
                },
                event = self.engine_rx.recv() => match event {
                    Some(event) => self.handle_engine_event(event).await?,
                    None => break,
                },
            }
        }
        Ok(())
    }

    async fn handle_message(&mut self, msg: SignalingMessage) -> Result<()> {
        debug!(
            "Session {} handling {} while {}",
            self.session.local_id(),
            msg.msg_type(),
            self.session.state()
        );

        match msg {
            SignalingMessage::RequestOffer => self.handle_request_offer().await,
            SignalingMessage::RequestAnswer(offer) => self.handle_request_answer(offer).await,
            SignalingMessage::Answered(answer) => self.handle_answered(answer).await,
            SignalingMessage::RemoteIceCandidates(candidates) => {
                self.handle_remote_candidates(candidates).await
            }
            // Outbound-only types arriving inbound are a relay defect; safe
            // to drop, like unknown types
            other => {
                warn!(
                    "Session {} ignoring outbound-only message {}",
                    self.session.local_id(),
                    other.msg_type()
                );
                Ok(())
            }
        }
    }

    /// First disambiguating trigger for the Offerer role
    async fn handle_request_offer(&mut self) -> Result<()> {
        match self.session.role() {
            Role::Offerer => {
                debug!(
                    "Session {} ignoring duplicate requestOffer",
                    self.session.local_id()
                );
                return Ok(());
            }
            Role::Answerer => {
                return Err(self.protocol_violation(
                    "requestOffer",
                    "role already assigned as answerer".to_string(),
                ));
            }
            Role::Unset => {}
        }

        self.session.assign_role(Role::Offerer);
        self.set_state(NegotiationState::RoleAssigning);

        let offer = self.engine_call(self.engine.create_offer().await)?;
        self.engine_call(self.engine.set_local_description(&offer).await)?;
        self.session.record_local_description(offer.clone());

        self.send(SignalingMessage::OfferResponse(offer))?;
        self.set_state(NegotiationState::DescriptionExchange);
        Ok(())
    }

    /// First disambiguating trigger for the Answerer role
    async fn handle_request_answer(&mut self, offer: Description) -> Result<()> {
        match self.session.role() {
            Role::Answerer => {
                if self.session.remote_matches(&offer) {
                    debug!(
                        "Session {} ignoring duplicate requestAnswer",
                        self.session.local_id()
                    );
                    return Ok(());
                }
                return Err(self.protocol_violation(
                    "requestAnswer",
                    "conflicting offer for already-assigned answerer".to_string(),
                ));
            }
            Role::Offerer => {
                return Err(self.protocol_violation(
                    "requestAnswer",
                    "role already assigned as offerer".to_string(),
                ));
            }
            Role::Unset => {}
        }

        if offer.kind != DescriptionKind::Offer {
            return Err(self.protocol_violation("requestAnswer", "payload is not an offer".to_string()));
        }

        self.session.assign_role(Role::Answerer);
        self.set_state(NegotiationState::RoleAssigning);

        self.engine_call(self.engine.set_remote_description(&offer).await)?;
        let buffered = self.session.record_remote_description(offer.clone());
        self.apply_candidates(buffered).await?;
        self.set_state(NegotiationState::DescriptionExchange);

        let answer = self.engine_call(self.engine.create_answer(&offer).await)?;
        self.engine_call(self.engine.set_local_description(&answer).await)?;
        self.session.record_local_description(answer.clone());

        self.send(SignalingMessage::AnswerResponse(answer))?;
        // Both descriptions exist on this side now
        self.set_state(NegotiationState::CandidateExchange);
        Ok(())
    }

    /// The peer's answer to our offer
    async fn handle_answered(&mut self, answer: Description) -> Result<()> {
        if self.session.has_remote_description() {
            if self.session.remote_matches(&answer) {
                debug!(
                    "Session {} ignoring duplicate answered",
                    self.session.local_id()
                );
                return Ok(());
            }
            return Err(self.protocol_violation(
                "answered",
                "remote description already set with different content".to_string(),
            ));
        }

        if self.session.role() != Role::Offerer {
            return Err(
                self.protocol_violation("answered", "session holds no offerer role".to_string())
            );
        }
        if answer.kind != DescriptionKind::Answer {
            return Err(self.protocol_violation("answered", "payload is not an answer".to_string()));
        }

        self.engine_call(self.engine.set_remote_description(&answer).await)?;
        let buffered = self.session.record_remote_description(answer);
        self.apply_candidates(buffered).await?;
        self.set_state(NegotiationState::CandidateExchange);
        Ok(())
    }

    /// Inbound candidates: applied in order, or buffered until the remote
    /// description exists
    async fn handle_remote_candidates(&mut self, candidates: Vec<Candidate>) -> Result<()> {
        if self.session.has_remote_description() {
            self.apply_candidates(candidates).await
        } else {
            debug!(
                "Session {} buffering {} candidates until remote description is set",
                self.session.local_id(),
                candidates.len()
            );
            self.session.buffer_remote_candidates(candidates);
            Ok(())
        }
    }

    async fn apply_candidates(&mut self, candidates: Vec<Candidate>) -> Result<()> {
        for candidate in candidates {
            self.engine_call(self.engine.add_remote_candidate(&candidate).await)?;
        }
        Ok(())
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            // Each local candidate goes out immediately, one per message
            EngineEvent::LocalCandidate(candidate) => {
                self.send(SignalingMessage::IceCandidate(candidate))?;
            }
            EngineEvent::RemoteTrack(track) => {
                info!(
                    "Session {} remote track {} ({})",
                    self.session.local_id(),
                    track.id,
                    track.kind
                );
                self.session.record_remote_track(track);
                self.publish();
            }
            EngineEvent::Connected => {
                info!("Session {} established", self.session.local_id());
                self.set_state(NegotiationState::Established);
            }
            EngineEvent::Failed(detail) => {
                return Err(self.media_failure(EngineError::Transport(detail)));
            }
        }
        Ok(())
    }

    fn send(&mut self, msg: SignalingMessage) -> Result<()> {
        let msg_type = msg.msg_type();
        self.channel
            .send(msg)
            .map_err(|_| self.channel_failure(format!("channel gone while sending {}", msg_type)))
    }

    fn set_state(&mut self, state: NegotiationState) {
        self.session.set_state(state);
        self.publish();
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.session.snapshot());
    }

    fn engine_call<T>(&self, result: std::result::Result<T, EngineError>) -> Result<T> {
        result.map_err(|e| self.media_failure(e))
    }

    fn media_failure(&self, source: EngineError) -> NegotiationError {
        NegotiationError::MediaEngineFailure {
            session: self.session.local_id().to_string(),
            state: self.session.state(),
            source,
        }
    }

    fn protocol_violation(&self, message: &str, detail: String) -> NegotiationError {
        NegotiationError::ProtocolViolation {
            session: self.session.local_id().to_string(),
            state: self.session.state(),
            message: message.to_string(),
            detail,
        }
    }

    fn channel_failure(&self, detail: String) -> NegotiationError {
        NegotiationError::ChannelFailure {
            session: self.session.local_id().to_string(),
            state: self.session.state(),
            detail,
        }
    }
}
