use crate::error::ChannelError;
use crate::peer::types::{EventSink, SessionEvent};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;

/// Single-fire "became ready" observer, same shape the engine uses.
pub type OpenHandler =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> + Send + Sync>;

/// Bidirectional message conduit owned by the transport engine.
#[async_trait]
pub trait AuxChannel: Send + Sync {
    fn name(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Registers the one and only open observer.
    fn when_open(&self, handler: OpenHandler);

    async fn send_message(&self, text: String) -> Result<usize, ChannelError>;
}

#[async_trait]
impl AuxChannel for RTCDataChannel {
    fn name(&self) -> &str {
        self.label()
    }

    fn is_open(&self) -> bool {
        self.ready_state() == RTCDataChannelState::Open
    }

    fn when_open(&self, handler: OpenHandler) {
        self.on_open(handler);
    }

    async fn send_message(&self, text: String) -> Result<usize, ChannelError> {
        self.send_text(text)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}

/// Voice activity detection settings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceActivityDetection {
    pub mode: String,
}

/// Session settings pushed to the remote side once the channel opens.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSettings {
    pub input_audio_format: String,
    pub input_text: bool,
    pub output_audio_format: String,
    pub output_text: bool,
    pub voice_activity_detection: VoiceActivityDetection,
    pub instructions: String,
}

/// `session.update` client event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionUpdate {
    #[serde(rename = "type")]
    kind: &'static str,
    pub session: SessionSettings,
}

impl SessionUpdate {
    pub fn new(session: SessionSettings) -> Self {
        Self {
            kind: "session.update",
            session,
        }
    }

    pub fn to_json(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Sends the configuration message if the channel is open and it has not
/// been sent yet. Returns `Ok(false)` when it was already sent.
pub async fn send_session_update(
    channel: &dyn AuxChannel,
    update: &SessionUpdate,
    sent: &AtomicBool,
) -> Result<bool, ChannelError> {
    if !channel.is_open() {
        return Err(ChannelError::NotOpen(channel.name().to_owned()));
    }
    let message = update.to_json()?;

    if sent.swap(true, Ordering::SeqCst) {
        debug!(channel = channel.name(), "session.update already sent");
        return Ok(false);
    }

    match channel.send_message(message).await {
        Ok(bytes) => {
            info!(channel = channel.name(), bytes, "session.update sent");
            Ok(true)
        }
        Err(e) => {
            // sending failed, allow a later open event to retry
            sent.store(false, Ordering::SeqCst);
            Err(e)
        }
    }
}

/// Wires the open observer and releases the caller's reference.
///
/// The engine owns the channel after creation; the observer only keeps a
/// `Weak` handle to it.
pub fn attach_channel(channel: Arc<dyn AuxChannel>, update: Arc<SessionUpdate>, events: EventSink) {
    let label = channel.name().to_owned();
    let weak: Weak<dyn AuxChannel> = Arc::downgrade(&channel);
    let sent = Arc::new(AtomicBool::new(false));

    channel.when_open(Box::new(move || {
        Box::pin(async move {
            info!(channel = %label, "Data channel opened, sending session.update");
            let Some(channel) = weak.upgrade() else {
                warn!(channel = %label, "{}", ChannelError::Gone);
                return;
            };

            match send_session_update(channel.as_ref(), &update, &sent).await {
                Ok(true) => events.emit(SessionEvent::ChannelConfigured { label }),
                Ok(false) => {}
                Err(e) => {
                    warn!(channel = %label, error = %e, "Failed to send session.update");
                    events.emit(SessionEvent::ChannelError {
                        label,
                        reason: e.to_string(),
                    });
                }
            }
        })
    }));

    drop(channel);
}
