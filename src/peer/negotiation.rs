use crate::error::{EngineError, NegotiationError, SignalingError};
use crate::peer::connection::PeerEngine;
use crate::peer::data_channel::{attach_channel, SessionUpdate};
use crate::peer::description::SessionDescription;
use crate::peer::state::NegotiationState;
use crate::peer::types::{EventSink, SessionEvent};
use crate::signaling::SignalingTransport;
use crate::utils::random_id;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Result of one negotiation cycle
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: String,
    pub state: NegotiationState,
    pub outcome: Result<(), NegotiationError>,
}

/// Drives the offer/answer exchange.
///
/// At most one [`Cycle`] exists at a time; [`Negotiator::begin`] refuses
/// while one is in flight.
pub struct Negotiator {
    engine: Arc<dyn PeerEngine>,
    signaling: Arc<dyn SignalingTransport>,
    channel_label: String,
    session_update: Arc<SessionUpdate>,
    channel_created: AtomicBool,
    events: EventSink,
    state: watch::Sender<NegotiationState>,
}

impl Negotiator {
    pub fn new(
        engine: Arc<dyn PeerEngine>,
        signaling: Arc<dyn SignalingTransport>,
        channel_label: impl Into<String>,
        session_update: Arc<SessionUpdate>,
        events: EventSink,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(NegotiationState::Idle);
        Arc::new(Self {
            engine,
            signaling,
            channel_label: channel_label.into(),
            session_update,
            channel_created: AtomicBool::new(false),
            events,
            state,
        })
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    /// Claims the negotiation slot and moves to `OFFER_REQUESTED`.
    pub fn begin(self: &Arc<Self>) -> Result<Cycle, NegotiationError> {
        let mut claimed = Ok(());
        self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                claimed = Err(NegotiationError::Busy);
                false
            } else if *state == NegotiationState::RemoteSet {
                claimed = Err(NegotiationError::AlreadyNegotiated);
                false
            } else {
                *state = NegotiationState::OfferRequested;
                true
            }
        });
        claimed?;

        let cycle = Cycle {
            id: random_id(),
            negotiator: Arc::clone(self),
        };
        info!(cycle = %cycle.id, "[NEG] negotiation cycle started");
        cycle.publish(NegotiationState::OfferRequested);
        Ok(cycle)
    }

    /// Creates the auxiliary channel once per session; failure only degrades.
    async fn setup_channel(&self) {
        if self.channel_created.load(Ordering::SeqCst) {
            debug!("[DC] DataChannel already created in an earlier cycle");
            return;
        }

        match self.engine.create_aux_channel(&self.channel_label).await {
            Ok(channel) => {
                self.channel_created.store(true, Ordering::SeqCst);
                info!(channel = %self.channel_label, "[DC] DataChannel created");
                attach_channel(channel, Arc::clone(&self.session_update), self.events.clone());
            }
            Err(e) => {
                error!("[ERR] Failed to create DataChannel, session.update cannot be sent: {e}");
                self.events.emit(SessionEvent::ChannelUnavailable {
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// One in-flight negotiation cycle; consumed by [`Cycle::run`].
pub struct Cycle {
    id: String,
    negotiator: Arc<Negotiator>,
}

impl Cycle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn run(self) -> CycleReport {
        let outcome = self.drive().await;

        if let Err(e) = &outcome {
            error!(cycle = %self.id, "[NEG] negotiation failed: {e}");
            self.force(NegotiationState::Failed);
        }

        let state = self.negotiator.state();
        self.negotiator.events.emit(SessionEvent::NegotiationFinished {
            cycle_id: self.id.clone(),
            state,
            error: outcome.as_ref().err().map(ToString::to_string),
        });

        CycleReport {
            cycle_id: self.id.clone(),
            state,
            outcome,
        }
    }

    async fn drive(&self) -> Result<(), NegotiationError> {
        let n = &self.negotiator;

        // channel first so the offer carries the data m-line
        n.setup_channel().await;

        let offer = n.engine.create_offer().await.map_err(NegotiationError::Offer)?;
        if n.channel_created.load(Ordering::SeqCst) && !offer.has_data_channel() {
            warn!("[SDP] offer carries no data channel m-line");
        }
        debug!("---- SDP OFFER ----\n{}\n---- END ----", offer.as_text());
        let offer_text = offer.as_text().to_owned();

        n.engine
            .set_local_description(offer)
            .await
            .map_err(NegotiationError::LocalDescription)?;
        info!("[SDP] Local offer set");
        self.advance(NegotiationState::LocalSet)?;

        let credential = n
            .signaling
            .fetch_credential()
            .await
            .map_err(NegotiationError::Credential)?;
        if credential.is_empty() {
            return Err(NegotiationError::Credential(SignalingError::MissingField(
                "client_secret.value",
            )));
        }
        self.advance(NegotiationState::CredentialFetched)?;

        let answer_text = n
            .signaling
            .exchange_description(&offer_text, &credential)
            .await
            .map_err(NegotiationError::Exchange)?;
        drop(credential);
        self.advance(NegotiationState::Exchanged)?;

        if answer_text.trim().is_empty() {
            return Err(NegotiationError::EmptyAnswer);
        }
        let answer = SessionDescription::remote_answer(&answer_text)
            .map_err(NegotiationError::InvalidAnswer)?;

        self.check(NegotiationState::RemoteSet)?;
        if !n.engine.has_local_description().await {
            return Err(NegotiationError::RemoteDescription(
                EngineError::NoLocalDescription,
            ));
        }
        n.engine
            .set_remote_description(answer)
            .await
            .map_err(NegotiationError::RemoteDescription)?;
        info!("[SDP] Remote answer set");
        self.advance(NegotiationState::RemoteSet)
    }

    fn check(&self, next: NegotiationState) -> Result<(), NegotiationError> {
        let from = self.negotiator.state();
        if from.can_transition_to(next) {
            Ok(())
        } else {
            Err(NegotiationError::IllegalTransition { from, to: next })
        }
    }

    fn advance(&self, next: NegotiationState) -> Result<(), NegotiationError> {
        self.check(next)?;
        self.force(next);
        Ok(())
    }

    fn force(&self, next: NegotiationState) {
        let from = self.negotiator.state.send_replace(next);
        if from != next {
            debug!(cycle = %self.id, "[NEG] {from} -> {next}");
            self.publish(next);
        }
    }

    fn publish(&self, state: NegotiationState) {
        self.negotiator.events.emit(SessionEvent::NegotiationState {
            cycle_id: self.id.clone(),
            state,
        });
    }
}

impl Drop for Cycle {
    // an aborted cycle must not leave the slot claimed
    fn drop(&mut self) {
        if self.negotiator.state().is_in_flight() {
            warn!(cycle = %self.id, "[NEG] cycle dropped while in flight");
            self.force(NegotiationState::Failed);
        }
    }
}
