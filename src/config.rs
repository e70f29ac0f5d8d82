// Application configuration
// Every option can come from the command line or from the environment.

use crate::credentials::ApiKey;
use crate::error::ConfigError;
use crate::peer::data_channel::{SessionSettings, SessionUpdate, VoiceActivityDetection};
use crate::utils::add_ice_url_scheme;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_SESSIONS_URL: &str = "https://api.openai.com/v1/realtime/sessions";
pub const DEFAULT_REALTIME_URL: &str = "https://api.openai.com/v1/realtime";
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are connected from a Rust WebRTC client with advanced VAD enabled (PCM24).";

/// Realtime WebRTC client
///
/// Negotiates a peer connection with a realtime API over HTTP signaling
/// and configures the session over a data channel once it opens.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// API key used to mint ephemeral credentials
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Realtime model id
    #[arg(long, default_value = DEFAULT_MODEL, env = "REALTIME_MODEL")]
    pub model: String,

    /// Credential-issuing endpoint
    #[arg(long, default_value = DEFAULT_SESSIONS_URL, env = "REALTIME_SESSIONS_URL")]
    pub sessions_url: String,

    /// Offer/answer endpoint; the model is sent as a query parameter
    #[arg(long, default_value = DEFAULT_REALTIME_URL, env = "REALTIME_URL")]
    pub realtime_url: String,

    /// STUN/TURN servers (comma-separated)
    #[arg(
        long = "stun-server",
        value_delimiter = ',',
        default_value = DEFAULT_STUN_SERVER,
        env = "REALTIME_STUN_SERVERS"
    )]
    pub stun_servers: Vec<String>,

    /// Timeout for each signaling HTTP request, in seconds
    #[arg(long, default_value_t = 15, env = "REALTIME_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Label of the auxiliary data channel
    #[arg(long, default_value = "data")]
    pub channel_label: String,

    /// Input and output audio format announced in session.update
    #[arg(long, default_value = "pcm24")]
    pub audio_format: String,

    /// Voice activity detection mode
    #[arg(long, default_value = "advanced")]
    pub vad_mode: String,

    /// Instructions for the model
    #[arg(long, default_value = DEFAULT_INSTRUCTIONS)]
    pub instructions: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Signaling endpoints and limits
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    pub api_key: ApiKey,
    pub model: String,
    pub sessions_url: String,
    pub realtime_url: String,
    pub request_timeout: Duration,
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub signaling: SignalingConfig,
    pub ice_servers: Vec<String>,
    pub channel_label: String,
    pub session_update: SessionUpdate,
    pub log_level: String,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let api_key = args
            .api_key
            .map(ApiKey::new)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        if args.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let ice_servers: Vec<String> = args
            .stun_servers
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(add_ice_url_scheme)
            .collect();
        if ice_servers.is_empty() {
            return Err(ConfigError::NoIceServers);
        }

        let session_update = SessionUpdate::new(SessionSettings {
            input_audio_format: args.audio_format.clone(),
            input_text: true,
            output_audio_format: args.audio_format,
            output_text: true,
            voice_activity_detection: VoiceActivityDetection {
                mode: args.vad_mode,
            },
            instructions: args.instructions,
        });

        Ok(Self {
            signaling: SignalingConfig {
                api_key,
                model: args.model,
                sessions_url: args.sessions_url,
                realtime_url: args.realtime_url,
                request_timeout: Duration::from_secs(args.request_timeout_secs),
            },
            ice_servers,
            channel_label: args.channel_label,
            session_update,
            log_level: args.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["realtime-rtc"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_follow_realtime_api() {
        let config = Config::from_args(parse(&["--api-key", "sk-test"])).unwrap();
        assert_eq!(config.signaling.model, DEFAULT_MODEL);
        assert_eq!(config.signaling.sessions_url, DEFAULT_SESSIONS_URL);
        assert_eq!(config.signaling.request_timeout, Duration::from_secs(15));
        assert_eq!(config.channel_label, "data");
        assert_eq!(config.session_update.session.voice_activity_detection.mode, "advanced");
    }

    #[test]
    fn blank_api_key_is_fatal() {
        let err = Config::from_args(parse(&["--api-key", " "])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_args(parse(&["--api-key", "sk", "--request-timeout-secs", "0"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout));
    }

    #[test]
    fn blank_ice_server_list_is_rejected() {
        let err = Config::from_args(parse(&["--api-key", "sk", "--stun-server", " , "]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoIceServers));
    }

    #[test]
    fn ice_servers_get_a_scheme() {
        let config = Config::from_args(parse(&[
            "--api-key",
            "sk",
            "--stun-server",
            "stun.example.org:3478,turn:relay.example.org",
        ]))
        .unwrap();
        assert_eq!(
            config.ice_servers,
            ["stun:stun.example.org:3478", "turn:relay.example.org"]
        );
    }
}
