pub mod config;
pub mod credentials;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

use crate::config::{Args, Config};
use crate::peer::{EventSink, RtcEngine};
use crate::session::Session;
use crate::signaling::HttpSignaling;
use clap::Parser;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, trace};

/// Parses configuration, then runs the session until Ctrl+C
pub fn run() -> anyhow::Result<()> {
    let config = Config::from_args(Args::parse())?;
    logger::init(&config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("rtc-worker")
        .enable_all()
        .build()?;

    runtime.block_on(run_session(config))
}

pub async fn run_session(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.signaling.model,
        api_key = %config.signaling.api_key.fingerprint(),
        "realtime-rtc starting"
    );

    let signaling = Arc::new(HttpSignaling::new(config.signaling.clone())?);
    let (engine, engine_events) = RtcEngine::new(&config.ice_servers).await?;
    let relay_expected = config
        .ice_servers
        .iter()
        .any(|url| url.starts_with("turn:") || url.starts_with("turns:"));

    let (events, mut event_rx) = EventSink::new();
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        trace!("session event: {json}");
                    }
                }
                Err(RecvError::Lagged(n)) => trace!("session event log skipped {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let session = Session::new(
        engine.clone(),
        signaling,
        config.channel_label,
        Arc::new(config.session_update),
        events,
    )
    .expect_relay(relay_expected);

    info!("Running event loop... (Ctrl+C to quit)");
    let final_state = session
        .run(engine_events, shutdown_on(tokio::signal::ctrl_c()))
        .await;

    info!(%final_state, "Event loop stopped, closing peer connection");
    engine.close().await?;
    Ok(())
}

/// Resolves once `signal` fires. A signal that cannot be installed is
/// logged and treated as an immediate shutdown.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for Ctrl+C, stopping: {e}");
    }
}
