use crate::error::DescriptionError;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use webrtc::sdp::description::session::SessionDescription as SdpMessage;

/// Offer or answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Which side produced the description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Local,
    Remote,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpKind::Offer => f.write_str("offer"),
            SdpKind::Answer => f.write_str("answer"),
        }
    }
}

/// Parsed, immutable session description.
///
/// The text is validated on construction, so any value of this type is
/// known to be well-formed SDP.
#[derive(Debug, Clone)]
pub struct SessionDescription {
    kind: SdpKind,
    origin: Origin,
    text: String,
    media: Vec<String>,
}

impl SessionDescription {
    fn parse(kind: SdpKind, origin: Origin, text: &str) -> Result<Self, DescriptionError> {
        if text.trim().is_empty() {
            return Err(DescriptionError::Empty);
        }

        let mut reader = Cursor::new(text.as_bytes());
        let parsed = SdpMessage::unmarshal(&mut reader)
            .map_err(|e| DescriptionError::Parse(e.to_string()))?;

        let media = parsed
            .media_descriptions
            .iter()
            .map(|m| m.media_name.media.clone())
            .collect();

        Ok(Self {
            kind,
            origin,
            text: text.to_owned(),
            media,
        })
    }

    /// Description produced by the local engine.
    pub fn local_offer(text: &str) -> Result<Self, DescriptionError> {
        Self::parse(SdpKind::Offer, Origin::Local, text)
    }

    /// Answer text received through signaling.
    pub fn remote_answer(text: &str) -> Result<Self, DescriptionError> {
        Self::parse(SdpKind::Answer, Origin::Remote, text)
    }

    pub fn kind(&self) -> SdpKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Canonical text serialization
    pub fn as_text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Media kinds in m-line order, e.g. `["audio", "application"]`
    pub fn media(&self) -> &[String] {
        &self.media
    }

    pub fn has_data_channel(&self) -> bool {
        self.media.iter().any(|m| m == "application")
    }
}
