pub mod connection;
pub mod data_channel;
pub mod description;
pub mod ice;
pub mod negotiation;
pub mod state;
pub mod types;

pub use connection::{PeerEngine, RtcEngine};
pub use data_channel::{AuxChannel, SessionUpdate};
pub use description::{Origin, SdpKind, SessionDescription};
pub use ice::{ConnectivityMonitor, ConnectivityState};
pub use negotiation::{Cycle, CycleReport, Negotiator};
pub use state::NegotiationState;
pub use types::{EngineEvent, EventSink, SessionEvent};
