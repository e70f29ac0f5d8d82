//! HTTP signaling: credential minting and offer/answer exchange.
//!
//! Each call is a single attempt bounded by the configured request timeout.
//! Responses are read fully before being handed back.

use crate::config::SignalingConfig;
use crate::credentials::EphemeralCredential;
use crate::error::SignalingError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const SDP_MEDIA_TYPE: &str = "application/sdp";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Out-of-band channel used to trade the local offer for a remote answer
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn fetch_credential(&self) -> Result<EphemeralCredential, SignalingError>;

    /// Returns the raw answer text; an empty string means no answer.
    async fn exchange_description(
        &self,
        offer_sdp: &str,
        credential: &EphemeralCredential,
    ) -> Result<String, SignalingError>;
}

#[derive(Serialize)]
struct CredentialRequest<'a> {
    model: &'a str,
}

#[derive(Deserialize)]
struct CredentialResponse {
    client_secret: Option<ClientSecret>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ClientSecret {
    value: Option<String>,
    expires_at: Option<i64>,
}

/// Extracts `client_secret.value` from a credential endpoint response
pub fn parse_credential(body: &str) -> Result<EphemeralCredential, SignalingError> {
    let resp: CredentialResponse = serde_json::from_str(body)
        .map_err(|e| SignalingError::MalformedResponse(e.to_string()))?;

    if let Some(err) = &resp.error {
        warn!("Credential endpoint reported an error: {err}");
    }

    let secret = resp
        .client_secret
        .ok_or(SignalingError::MissingField("client_secret"))?;
    match secret.value {
        Some(value) if !value.is_empty() => Ok(EphemeralCredential::new(value, secret.expires_at)),
        _ => Err(SignalingError::MissingField("client_secret.value")),
    }
}

/// `reqwest`-backed signaling client
#[derive(Debug, Clone)]
pub struct HttpSignaling {
    config: SignalingConfig,
    client: reqwest::Client,
}

impl HttpSignaling {
    pub fn new(config: SignalingConfig) -> Result<Self, SignalingError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn log_status(endpoint: &str, status: StatusCode) {
        if status.is_success() {
            debug!(%status, "{endpoint} responded");
        } else {
            // body is still validated by the caller
            warn!(%status, "{endpoint} responded with non-success status");
        }
    }
}

#[async_trait]
impl SignalingTransport for HttpSignaling {
    async fn fetch_credential(&self) -> Result<EphemeralCredential, SignalingError> {
        let request = CredentialRequest {
            model: &self.config.model,
        };

        let resp = self
            .client
            .post(&self.config.sessions_url)
            .bearer_auth(self.config.api_key.expose())
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| warn!("Credential request failed: {e}"))?;

        Self::log_status("credential endpoint", resp.status());
        let body = resp.text().await?;

        match parse_credential(&body) {
            Ok(credential) => {
                info!(
                    fingerprint = %credential.fingerprint(),
                    expires_at = ?credential.expires_at(),
                    "[KEY] Ephemeral credential issued"
                );
                Ok(credential)
            }
            Err(e) => {
                warn!("Unexpected credential response: {e}");
                Err(e)
            }
        }
    }

    async fn exchange_description(
        &self,
        offer_sdp: &str,
        credential: &EphemeralCredential,
    ) -> Result<String, SignalingError> {
        let resp = self
            .client
            .post(&self.config.realtime_url)
            .query(&[("model", self.config.model.as_str())])
            .bearer_auth(credential.expose())
            .header(CONTENT_TYPE, SDP_MEDIA_TYPE)
            .header(ACCEPT, SDP_MEDIA_TYPE)
            .body(offer_sdp.to_owned())
            .send()
            .await
            .inspect_err(|e| warn!("Offer exchange failed: {e}"))?;

        Self::log_status("negotiation endpoint", resp.status());
        let answer = resp.text().await?;
        debug!("---- SDP ANSWER ----\n{answer}\n---- END ----");
        Ok(answer)
    }
}
