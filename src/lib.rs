pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod negotiation;

pub use bootstrap::Registration;
pub use config::Config;
pub use engine::{EngineError, EngineEvent, MediaEngine, TrackInfo, WebRtcEngine};
pub use negotiation::{
    Candidate, ChannelEvent, ChannelHandle, Description, DescriptionKind, Frame, NegotiationError,
    NegotiationState, Negotiator, NegotiatorHandle, Role, SessionPool, SignalingChannel,
    SignalingMessage,
};
