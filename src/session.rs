//! Session context and its single event loop.
//!
//! Engine signals are dispatched one at a time. A negotiation cycle runs in
//! its own task so connectivity events keep flowing while signaling calls
//! are in flight; the loop rejoins it through the task handle.

use crate::error::NegotiationError;
use crate::peer::connection::PeerEngine;
use crate::peer::data_channel::SessionUpdate;
use crate::peer::ice::{ConnectivityMonitor, ConnectivityState};
use crate::peer::negotiation::{CycleReport, Negotiator};
use crate::peer::state::{NegotiationState, GRACE_PERIOD};
use crate::peer::types::{EngineEvent, EventSink, SessionEvent};
use crate::signaling::SignalingTransport;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

pub struct Session {
    negotiator: Arc<Negotiator>,
    monitor: ConnectivityMonitor,
    events: EventSink,
    grace_deadline: Option<Instant>,
}

impl Session {
    pub fn new(
        engine: Arc<dyn PeerEngine>,
        signaling: Arc<dyn SignalingTransport>,
        channel_label: impl Into<String>,
        session_update: Arc<SessionUpdate>,
        events: EventSink,
    ) -> Self {
        let negotiator = Negotiator::new(
            engine,
            signaling,
            channel_label,
            session_update,
            events.clone(),
        );
        Self {
            negotiator,
            monitor: ConnectivityMonitor::new(),
            events,
            grace_deadline: None,
        }
    }

    /// See [`ConnectivityMonitor::expect_relay`].
    pub fn expect_relay(mut self, expected: bool) -> Self {
        self.monitor = self.monitor.expect_relay(expected);
        self
    }

    pub fn negotiator(&self) -> &Arc<Negotiator> {
        &self.negotiator
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Handles one engine signal. Returns the task of a newly started cycle.
    pub fn dispatch(&mut self, event: EngineEvent) -> Option<JoinHandle<CycleReport>> {
        match event {
            EngineEvent::NegotiationNeeded => return self.on_negotiation_needed(),
            EngineEvent::IceConnectionStateChanged(raw) => {
                let state = self.monitor.observe_state(raw);
                self.track_grace(&state);
                self.events.emit(SessionEvent::Connectivity { state });
            }
            EngineEvent::CandidateDiscovered {
                candidate,
                sdp_mline_index,
            } => {
                self.monitor.observe_candidate(&candidate, sdp_mline_index);
                self.events.emit(SessionEvent::Candidate { candidate });
            }
            EngineEvent::GatheringComplete => self.monitor.gathering_complete(),
        }
        None
    }

    fn on_negotiation_needed(&mut self) -> Option<JoinHandle<CycleReport>> {
        match self.negotiator.begin() {
            Ok(cycle) => {
                debug!(cycle = cycle.id(), "[NEG] spawning negotiation task");
                Some(tokio::spawn(cycle.run()))
            }
            Err(NegotiationError::Busy) => {
                warn!("[NEG] negotiation-needed ignored: a cycle is already in flight");
                None
            }
            Err(e) => {
                info!("[NEG] negotiation-needed ignored: {e}");
                None
            }
        }
    }

    fn track_grace(&mut self, state: &ConnectivityState) {
        match state {
            ConnectivityState::Disconnected => {
                if self.grace_deadline.is_none() {
                    info!("Grace period started, waiting {} s", GRACE_PERIOD.as_secs());
                    self.grace_deadline = Some(Instant::now() + GRACE_PERIOD);
                }
            }
            s if s.is_up() => {
                if self.grace_deadline.take().is_some() {
                    info!("Connection recovered during grace period");
                }
            }
            _ => self.grace_deadline = None,
        }
    }

    fn finish_cycle(&self, report: CycleReport) {
        match &report.outcome {
            Ok(()) => info!(cycle = %report.cycle_id, "[NEG] negotiated, state {}", report.state),
            Err(e) => warn!(
                cycle = %report.cycle_id,
                "[NEG] cycle ended in {}: {e}",
                report.state
            ),
        }
    }

    /// Runs until `shutdown` resolves or the engine stops sending signals.
    ///
    /// An in-flight cycle is aborted on exit. Returns the final negotiation
    /// state.
    pub async fn run<F>(
        mut self,
        mut engine_events: mpsc::UnboundedReceiver<EngineEvent>,
        shutdown: F,
    ) -> NegotiationState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycle: Option<JoinHandle<CycleReport>> = None;

        loop {
            let in_flight = cycle.is_some();
            let grace = self.grace_deadline;
            let deadline = grace.unwrap_or_else(Instant::now);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                Some(joined) = async {
                    match cycle.as_mut() {
                        Some(handle) => Some(handle.await),
                        None => None,
                    }
                }, if in_flight => {
                    cycle = None;
                    match joined {
                        Ok(report) => self.finish_cycle(report),
                        Err(e) => error!("Negotiation task failed: {e}"),
                    }
                }
                event = engine_events.recv() => {
                    let Some(event) = event else {
                        info!("Engine event stream closed");
                        break;
                    };
                    if let Some(handle) = self.dispatch(event) {
                        cycle = Some(handle);
                    }
                }
                () = sleep_until(deadline), if grace.is_some() => {
                    self.grace_deadline = None;
                    warn!(
                        "Connection did not recover within {} s",
                        GRACE_PERIOD.as_secs()
                    );
                    self.events.emit(SessionEvent::ConnectivityLost);
                }
            }
        }

        if let Some(handle) = cycle.take() {
            warn!("Aborting in-flight negotiation cycle");
            handle.abort();
            let _ = handle.await;
        }

        self.negotiator.state()
    }
}
