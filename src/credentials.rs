//! Secret values: the long-lived API key and the per-cycle ephemeral credential.
//!
//! Both wipe their memory on drop and only ever print a short fingerprint.

use chrono::{DateTime, Local, TimeZone};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..6])
}

/// API key read from the environment at startup
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.fingerprint())
    }
}

/// Short-lived bearer token, good for exactly one description exchange.
///
/// Deliberately not `Clone`: the exchange consumes it.
pub struct EphemeralCredential {
    value: Zeroizing<String>,
    expires_at: Option<i64>,
}

impl EphemeralCredential {
    pub fn new(value: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            expires_at,
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Expiry as local time, when the issuer reported one
    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        self.expires_at
            .and_then(|secs| Local.timestamp_opt(secs, 0).single())
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.value)
    }
}

impl fmt::Debug for EphemeralCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralCredential")
            .field("fingerprint", &self.fingerprint())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secret() {
        let key = ApiKey::new("sk-very-secret");
        let cred = EphemeralCredential::new("ek_abc123", Some(1_700_000_000));
        assert!(!format!("{key:?}").contains("sk-very-secret"));
        assert!(!format!("{cred:?}").contains("ek_abc123"));
        assert_eq!(key.fingerprint().len(), 12);
    }

    #[test]
    fn expiry_converts_to_local_time() {
        let cred = EphemeralCredential::new("ek_abc123", Some(1_700_000_000));
        assert_eq!(cred.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(EphemeralCredential::new("x", None).expires_at().is_none());
    }

    #[test]
    fn blank_api_key_is_empty() {
        assert!(ApiKey::new("  ").is_empty());
        assert!(!ApiKey::new("sk-1").is_empty());
    }
}
