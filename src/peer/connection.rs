use crate::error::EngineError;
use crate::logger::dump_selected_pair;
use crate::peer::data_channel::AuxChannel;
use crate::peer::description::SessionDescription;
use crate::peer::types::EngineEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

/// The media/transport engine as seen by the orchestrator.
///
/// Applying a description moves it into the engine.
#[async_trait]
pub trait PeerEngine: Send + Sync {
    async fn create_aux_channel(&self, label: &str) -> Result<Arc<dyn AuxChannel>, EngineError>;

    async fn create_offer(&self) -> Result<SessionDescription, EngineError>;

    async fn set_local_description(&self, offer: SessionDescription) -> Result<(), EngineError>;

    async fn set_remote_description(&self, answer: SessionDescription) -> Result<(), EngineError>;

    async fn has_local_description(&self) -> bool;
}

/// webrtc-rs peer connection plus its event forwarding
pub struct RtcEngine {
    pc: Arc<RTCPeerConnection>,
}

impl RtcEngine {
    /// Creates the peer connection and forwards its signals to the session loop.
    ///
    /// Handlers are registered before the audio transceiver is added so the
    /// first negotiation-needed signal is not missed.
    pub async fn new(
        ice_servers: &[String],
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<EngineEvent>), EngineError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(api.new_peer_connection(rtc_config(ice_servers)).await?);
        let (tx, rx) = mpsc::unbounded_channel();

        let tx_neg = tx.clone();
        pc.on_negotiation_needed(Box::new(move || {
            debug!("[NEG] on-negotiation-needed");
            let _ = tx_neg.send(EngineEvent::NegotiationNeeded);
            Box::pin(async {})
        }));

        let tx_ice = tx.clone();
        pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
            let _ = tx_ice.send(EngineEvent::IceConnectionStateChanged(st));
            Box::pin(async {})
        }));

        let tx_cand = tx;
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            let tx = tx_cand.clone();
            Box::pin(async move {
                let Some(c) = cand else {
                    let _ = tx.send(EngineEvent::GatheringComplete);
                    return;
                };
                match c.to_json() {
                    Ok(init) => {
                        let _ = tx.send(EngineEvent::CandidateDiscovered {
                            candidate: init.candidate,
                            sdp_mline_index: init.sdp_mline_index,
                        });
                    }
                    Err(e) => warn!("Failed to serialize ICE candidate: {e}"),
                }
            })
        }));

        let pc_state = Arc::downgrade(&pc);
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            info!("Peer connection state changed to: {st:?}");
            let pc_state = pc_state.clone();
            Box::pin(async move {
                if st == RTCPeerConnectionState::Failed {
                    if let Some(pc) = pc_state.upgrade() {
                        dump_selected_pair(&pc, "BEFORE-FAIL").await;
                    }
                }
            })
        }));

        // audio m-line; capture and playback are wired elsewhere
        pc.add_transceiver_from_kind(RTPCodecType::Audio, None).await?;

        Ok((Arc::new(Self { pc }), rx))
    }

    pub async fn close(&self) -> Result<(), EngineError> {
        self.pc.close().await?;
        Ok(())
    }
}

#[async_trait]
impl PeerEngine for RtcEngine {
    async fn create_aux_channel(&self, label: &str) -> Result<Arc<dyn AuxChannel>, EngineError> {
        let dc = self
            .pc
            .create_data_channel(label, Some(RTCDataChannelInit::default()))
            .await?;
        observe_inbound(&dc);
        Ok(dc)
    }

    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        let offer = self.pc.create_offer(None).await?;
        Ok(SessionDescription::local_offer(&offer.sdp)?)
    }

    async fn set_local_description(&self, offer: SessionDescription) -> Result<(), EngineError> {
        let desc = RTCSessionDescription::offer(offer.into_text())?;
        self.pc.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, answer: SessionDescription) -> Result<(), EngineError> {
        if self.pc.local_description().await.is_none() {
            return Err(EngineError::NoLocalDescription);
        }
        let desc = RTCSessionDescription::answer(answer.into_text())?;
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    async fn has_local_description(&self) -> bool {
        self.pc.local_description().await.is_some()
    }
}

/// Logs server events and channel close; nothing is sent from here
fn observe_inbound(dc: &Arc<RTCDataChannel>) {
    let label = dc.label().to_owned();
    dc.on_message(Box::new(move |msg| {
        let text = String::from_utf8_lossy(&msg.data);
        let kind = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned));
        match kind {
            Some(kind) => debug!(channel = %label, "[DC] server event: {kind}"),
            None => debug!(channel = %label, len = msg.data.len(), "[DC] message received"),
        }
        Box::pin(async {})
    }));

    let label = dc.label().to_owned();
    dc.on_close(Box::new(move || {
        info!(channel = %label, "[DC] Data channel closed");
        Box::pin(async {})
    }));
}

/// Creates the configuration for the peer connection
fn rtc_config(ice_servers: &[String]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: ice_servers.to_vec(),
            ..Default::default()
        }],
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}
