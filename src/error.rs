//! Error types for the signaling, engine and negotiation layers

use thiserror::Error;

use crate::peer::state::NegotiationState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is missing (set OPENAI_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,

    #[error("At least one ICE server is required")]
    NoIceServers,
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response is missing field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("Session description text is empty")]
    Empty,

    #[error("Failed to parse session description: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("WebRTC error: {0}")]
    Rtc(#[from] webrtc::Error),

    #[error("Invalid session description: {0}")]
    Description(#[from] DescriptionError),

    #[error("Remote description applied before local description")]
    NoLocalDescription,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel `{0}` is not open")]
    NotOpen(String),

    #[error("Channel was released by the transport engine")]
    Gone,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to send message: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("A negotiation cycle is already in flight")]
    Busy,

    #[error("Session is already negotiated")]
    AlreadyNegotiated,

    #[error("Illegal state transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: NegotiationState,
        to: NegotiationState,
    },

    #[error("Offer creation failed: {0}")]
    Offer(#[source] EngineError),

    #[error("Applying local description failed: {0}")]
    LocalDescription(#[source] EngineError),

    #[error("Ephemeral credential unavailable: {0}")]
    Credential(#[source] SignalingError),

    #[error("Description exchange failed: {0}")]
    Exchange(#[source] SignalingError),

    #[error("Exchange returned an empty answer")]
    EmptyAnswer,

    #[error("Answer could not be parsed: {0}")]
    InvalidAnswer(#[source] DescriptionError),

    #[error("Applying remote description failed: {0}")]
    RemoteDescription(#[source] EngineError),
}
