//! Typed error enum for the channel crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("remote request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("remote responded with HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl ChannelError {
    /// Whether a later publish attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Encode(_) | Self::ClientInit(_) => false,
        }
    }
}
