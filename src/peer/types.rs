use crate::peer::ice::ConnectivityState;
use crate::peer::state::NegotiationState;
use serde::Serialize;
use tokio::sync::broadcast;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;

/// Signals raised by the transport engine, dispatched serially on the session loop
#[derive(Debug, Clone)]
pub enum EngineEvent {
    NegotiationNeeded,
    IceConnectionStateChanged(RTCIceConnectionState),
    CandidateDiscovered {
        candidate: String,
        sdp_mline_index: Option<u16>,
    },
    GatheringComplete,
}

/// Structured notifications for whoever embeds the session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    NegotiationState {
        cycle_id: String,
        state: NegotiationState,
    },
    NegotiationFinished {
        cycle_id: String,
        state: NegotiationState,
        error: Option<String>,
    },
    ChannelUnavailable {
        reason: String,
    },
    ChannelConfigured {
        label: String,
    },
    ChannelError {
        label: String,
        reason: String,
    },
    Connectivity {
        state: ConnectivityState,
    },
    ConnectivityLost,
    Candidate {
        candidate: String,
    },
}

/// Fan-out of session events; sending with no subscribers is not an error
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSink {
    const CAPACITY: usize = 64;

    pub fn new() -> (Self, broadcast::Receiver<SessionEvent>) {
        let (tx, rx) = broadcast::channel(Self::CAPACITY);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}
