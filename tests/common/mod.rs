#![allow(dead_code)]

use async_trait::async_trait;
use realtime_rtc_lib::credentials::EphemeralCredential;
use realtime_rtc_lib::error::{ChannelError, EngineError, SignalingError};
use realtime_rtc_lib::peer::data_channel::{
    OpenHandler, SessionSettings, SessionUpdate, VoiceActivityDetection,
};
use realtime_rtc_lib::peer::{AuxChannel, PeerEngine, SessionDescription};
use realtime_rtc_lib::signaling::{parse_credential, SignalingTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const OFFER_SDP: &str = "v=0\r\n\
o=- 4215775240449105457 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=sendrecv\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=sctp-port:5000\r\n";

pub const ANSWER_SDP: &str = "v=0\r\n\
o=- 6543245 1 IN IP4 0.0.0.0\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
m=audio 3478 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 198.51.100.10\r\n\
a=mid:0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=sendrecv\r\n\
m=application 3478 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 198.51.100.10\r\n\
a=mid:1\r\n\
a=sctp-port:5000\r\n";

pub fn session_update() -> SessionUpdate {
    SessionUpdate::new(SessionSettings {
        input_audio_format: "pcm24".into(),
        input_text: true,
        output_audio_format: "pcm24".into(),
        output_text: true,
        voice_activity_detection: VoiceActivityDetection {
            mode: "advanced".into(),
        },
        instructions: "test".into(),
    })
}

#[derive(Default)]
pub struct FakeChannel {
    open: AtomicBool,
    pub sent: Mutex<Vec<String>>,
    handler: Mutex<Option<OpenHandler>>,
}

impl FakeChannel {
    pub async fn fire_open(&self) {
        self.open.store(true, Ordering::SeqCst);
        let handler = self.handler.lock().unwrap().take();
        if let Some(handler) = handler {
            handler().await;
        }
    }
}

#[async_trait]
impl AuxChannel for FakeChannel {
    fn name(&self) -> &str {
        "data"
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn when_open(&self, handler: OpenHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn send_message(&self, text: String) -> Result<usize, ChannelError> {
        let len = text.len();
        self.sent.lock().unwrap().push(text);
        Ok(len)
    }
}

/// Records every call the orchestrator makes
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<&'static str>>,
    pub local: Mutex<Option<SessionDescription>>,
    pub remote: Mutex<Option<SessionDescription>>,
    pub fail_channel: bool,
    pub fail_offer: bool,
    pub fail_local: bool,
    pub channel: Arc<FakeChannel>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.lock().unwrap().is_some()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PeerEngine for FakeEngine {
    async fn create_aux_channel(&self, _label: &str) -> Result<Arc<dyn AuxChannel>, EngineError> {
        self.record("create_aux_channel");
        if self.fail_channel {
            return Err(EngineError::Rtc(webrtc::Error::ErrConnectionClosed));
        }
        Ok(self.channel.clone())
    }

    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        self.record("create_offer");
        if self.fail_offer {
            return Err(EngineError::Rtc(webrtc::Error::ErrConnectionClosed));
        }
        Ok(SessionDescription::local_offer(OFFER_SDP)?)
    }

    async fn set_local_description(&self, offer: SessionDescription) -> Result<(), EngineError> {
        self.record("set_local");
        if self.fail_local {
            return Err(EngineError::Rtc(webrtc::Error::ErrConnectionClosed));
        }
        *self.local.lock().unwrap() = Some(offer);
        Ok(())
    }

    async fn set_remote_description(&self, answer: SessionDescription) -> Result<(), EngineError> {
        self.record("set_remote");
        if self.local.lock().unwrap().is_none() {
            return Err(EngineError::NoLocalDescription);
        }
        *self.remote.lock().unwrap() = Some(answer);
        Ok(())
    }

    async fn has_local_description(&self) -> bool {
        self.local.lock().unwrap().is_some()
    }
}

/// Serves canned responses; optionally holds the exchange until released
pub struct FakeSignaling {
    pub credential_body: String,
    pub answer: String,
    pub calls: Mutex<Vec<&'static str>>,
    pub exchanged_with: Mutex<Option<String>>,
    pub gate: Option<Arc<Notify>>,
    pub fail_exchange: bool,
}

impl FakeSignaling {
    pub fn new(credential_body: &str, answer: &str) -> Self {
        Self {
            credential_body: credential_body.to_owned(),
            answer: answer.to_owned(),
            calls: Mutex::new(Vec::new()),
            exchanged_with: Mutex::new(None),
            gate: None,
            fail_exchange: false,
        }
    }

    pub fn ok() -> Self {
        Self::new(r#"{"client_secret":{"value":"ek_abc123"}}"#, ANSWER_SDP)
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Exchange endpoint unreachable
    pub fn failing_exchange(mut self) -> Self {
        self.fail_exchange = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalingTransport for FakeSignaling {
    async fn fetch_credential(&self) -> Result<EphemeralCredential, SignalingError> {
        self.calls.lock().unwrap().push("fetch_credential");
        parse_credential(&self.credential_body)
    }

    async fn exchange_description(
        &self,
        offer_sdp: &str,
        credential: &EphemeralCredential,
    ) -> Result<String, SignalingError> {
        self.calls.lock().unwrap().push("exchange");
        assert!(!credential.is_empty());
        *self.exchanged_with.lock().unwrap() = Some(offer_sdp.to_owned());
        if self.fail_exchange {
            return Err(SignalingError::MalformedResponse("connection reset".into()));
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.answer.clone())
    }
}
