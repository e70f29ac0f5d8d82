use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;

/// Connectivity-establishment progress as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
    /// Anything outside the known set, with the raw value kept for logs
    Unknown(String),
}

impl From<RTCIceConnectionState> for ConnectivityState {
    #[allow(unreachable_patterns)]
    fn from(state: RTCIceConnectionState) -> Self {
        match state {
            RTCIceConnectionState::New => Self::New,
            RTCIceConnectionState::Checking => Self::Checking,
            RTCIceConnectionState::Connected => Self::Connected,
            RTCIceConnectionState::Completed => Self::Completed,
            RTCIceConnectionState::Failed => Self::Failed,
            RTCIceConnectionState::Disconnected => Self::Disconnected,
            RTCIceConnectionState::Closed => Self::Closed,
            other => Self::Unknown(format!("{other:?}")),
        }
    }
}

impl ConnectivityState {
    /// A usable path exists
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Connected | Self::Completed)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("New"),
            Self::Checking => f.write_str("Checking"),
            Self::Connected => f.write_str("Connected"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Closed => f.write_str("Closed"),
            Self::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Candidate counts per type
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateTally {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
    pub other: usize,
}

impl CandidateTally {
    pub fn record(&mut self, candidate: &str) {
        if candidate.contains("typ host") {
            self.host += 1;
        } else if candidate.contains("typ srflx") {
            self.srflx += 1;
        } else if candidate.contains("typ relay") {
            self.relay += 1;
        } else {
            self.other += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.host + self.srflx + self.relay + self.other
    }
}

/// Observes connectivity transitions and gathered candidates.
///
/// Purely observational: it never changes engine state and never retries.
#[derive(Debug, Default)]
pub struct ConnectivityMonitor {
    current: Option<ConnectivityState>,
    tally: CandidateTally,
    relay_expected: bool,
    relay_warned: bool,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn on `Checking` without relay candidates; only useful when a TURN
    /// server is configured.
    pub fn expect_relay(mut self, expected: bool) -> Self {
        self.relay_expected = expected;
        self
    }

    pub fn current(&self) -> Option<&ConnectivityState> {
        self.current.as_ref()
    }

    pub fn tally(&self) -> CandidateTally {
        self.tally
    }

    pub fn observe_state(&mut self, raw: RTCIceConnectionState) -> ConnectivityState {
        let state = ConnectivityState::from(raw);

        match &state {
            ConnectivityState::New => info!("[ICE] New"),
            ConnectivityState::Checking => {
                info!("[ICE] Checking");
                self.warn_without_relay();
            }
            ConnectivityState::Connected => info!("[ICE] Connected"),
            ConnectivityState::Completed => info!("[ICE] Completed"),
            ConnectivityState::Failed => {
                error!("[ICE] Failed (no automatic renegotiation)");
            }
            ConnectivityState::Disconnected => warn!("[ICE] Disconnected"),
            ConnectivityState::Closed => info!("[ICE] Closed"),
            ConnectivityState::Unknown(raw) => warn!("[ICE] Unknown or new state: {raw}"),
        }

        self.current = Some(state.clone());
        state
    }

    pub fn observe_candidate(&mut self, candidate: &str, sdp_mline_index: Option<u16>) {
        self.tally.record(candidate);
        info!(mline = ?sdp_mline_index, "[ICE] Candidate gathered: {candidate}");
    }

    pub fn gathering_complete(&self) {
        let t = self.tally;
        debug!(
            "Candidate analysis: {} host, {} srflx, {} relay",
            t.host, t.srflx, t.relay
        );
    }

    fn warn_without_relay(&mut self) {
        if self.tally.relay > 0 || self.relay_warned {
            return;
        }
        if self.relay_expected {
            self.relay_warned = true;
            warn!("No TURN relay candidates found! Connection through NAT may fail.");
        } else {
            debug!("No relay candidates (no TURN server configured)");
        }
    }
}
