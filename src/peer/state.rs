use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// ========== NEGOTIATION STATE ==========

/// Progress of a single negotiation cycle.
///
/// `Idle` is initial; `RemoteSet` and `Failed` are terminal for the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NegotiationState {
    Idle,
    OfferRequested,
    LocalSet,
    CredentialFetched,
    Exchanged,
    RemoteSet,
    Failed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RemoteSet | Self::Failed)
    }

    /// A cycle is running and no new one may begin.
    pub fn is_in_flight(self) -> bool {
        !matches!(self, Self::Idle) && !self.is_terminal()
    }

    pub fn can_transition_to(self, next: NegotiationState) -> bool {
        use NegotiationState::*;
        match (self, next) {
            (Idle | RemoteSet | Failed, OfferRequested) => true,
            (OfferRequested, LocalSet) => true,
            (LocalSet, CredentialFetched) => true,
            (CredentialFetched, Exchanged) => true,
            (Exchanged, RemoteSet) => true,
            (from, Failed) => from.is_in_flight(),
            _ => false,
        }
    }

    /// Remote description may only follow a successfully applied local one.
    pub fn local_applied(self) -> bool {
        matches!(
            self,
            Self::LocalSet | Self::CredentialFetched | Self::Exchanged | Self::RemoteSet
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::OfferRequested => "OFFER_REQUESTED",
            Self::LocalSet => "LOCAL_SET",
            Self::CredentialFetched => "CREDENTIAL_FETCHED",
            Self::Exchanged => "EXCHANGED",
            Self::RemoteSet => "REMOTE_SET",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// ========== CONSTANTS ==========

/// How long a disconnected path may take to recover before it is reported lost
pub const GRACE_PERIOD: Duration = Duration::from_secs(10);
