//! Signaling channel adapter
//!
//! Owns the one relay WebSocket connection for a session. Inbound frames are
//! deserialized into typed messages and handed to the negotiator in arrival
//! order; outbound messages get `from: localId` attached and go out through a
//! writer task, so sending never blocks the caller. Unknown message types are
//! logged and dropped. Transport failures after connect surface as channel
//! events, separate from negotiation errors.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::error::{NegotiationError, Result};
use super::types::{Frame, NegotiationState, SignalingMessage};

/// Events delivered to the negotiator, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A well-formed inbound message
    Message(SignalingMessage),
    /// An inbound frame that could not be parsed
    Malformed(String),
    /// Transport-level failure, reported asynchronously
    Error(String),
    /// The relay closed the connection
    Closed,
}

/// Sending half of the channel, held by the negotiator
///
/// `send` enqueues and returns immediately; the writer task owns the socket.
#[derive(Clone)]
pub struct ChannelHandle {
    tx: mpsc::UnboundedSender<SignalingMessage>,
}

impl ChannelHandle {
    pub fn send(
        &self,
        msg: SignalingMessage,
    ) -> std::result::Result<(), mpsc::error::SendError<SignalingMessage>> {
        self.tx.send(msg)
    }

    /// In-memory handle, for wiring a negotiator without a relay connection
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<SignalingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// One relay connection for one session
pub struct SignalingChannel;

impl SignalingChannel {
    /// Connect to the relay and spawn the reader and writer tasks
    ///
    /// Requires a completed registration: the ws endpoint comes out of it and
    /// `local_id` is stamped on every outbound frame.
    pub async fn connect(
        ws_url: &str,
        local_id: String,
    ) -> Result<(ChannelHandle, mpsc::Receiver<ChannelEvent>)> {
        info!("Connecting to relay: {}", ws_url);

        let (ws_stream, _) = connect_async(ws_url).await.map_err(|e| {
            NegotiationError::ChannelFailure {
                session: local_id.clone(),
                state: NegotiationState::Idle,
                detail: format!("failed to connect to relay: {}", e),
            }
        })?;

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalingMessage>();
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(64);

        // Writer task: attach `from` and serialize
        let writer_events = event_tx.clone();
        let from = local_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let msg_type = msg.msg_type();
                let frame = msg.into_frame(&from);
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {} frame: {}", msg_type, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    let _ = writer_events
                        .send(ChannelEvent::Error(format!("relay send failed: {}", e)))
                        .await;
                    break;
                }
                debug!("Sent {}", msg_type);
            }
        });

        // Reader task: frames in, typed events out
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = Self::decode(&text) {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Err(e) => {
                        error!("Relay connection error: {}", e);
                        let _ = event_tx
                            .send(ChannelEvent::Error(format!("relay receive failed: {}", e)))
                            .await;
                        break;
                    }
                    _ => {}
                }
            }
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        Ok((ChannelHandle { tx: out_tx }, event_rx))
    }

    /// Decode one inbound text frame. `None` means drop it silently.
    pub(crate) fn decode(text: &str) -> Option<ChannelEvent> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                return Some(ChannelEvent::Malformed(format!(
                    "unparseable frame: {}",
                    e
                )))
            }
        };

        match SignalingMessage::from_frame(&frame) {
            Ok(Some(msg)) => {
                debug!("Received {} from {}", msg.msg_type(), frame.from);
                Some(ChannelEvent::Message(msg))
            }
            Ok(None) => {
                warn!("Dropping unknown message type: {}", frame.kind);
                None
            }
            Err(e) => Some(ChannelEvent::Malformed(format!(
                "bad {} payload: {}",
                frame.kind, e
            ))),
        }
    }
}
