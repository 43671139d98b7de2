//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("could not connect to build server {endpoint}: {message}")]
    ConnectionFailed { endpoint: String, message: String },

    #[error("build stream interrupted: {message}")]
    StreamInterrupted { message: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("artifact download failed for {url}: {message}")]
    ArtifactFetchFailed { url: String, message: String },
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionFailed { .. } => {
                Some("Check that the build server is running and reachable.")
            }
            Self::InvalidUrl(_) => Some("Check the server address in MAKE_SERVER or the config."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ConnectionFailed { .. } => "network.connection_failed",
            Self::StreamInterrupted { .. } => "network.stream_interrupted",
            Self::HttpError { .. } => "network.http_error",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::ArtifactFetchFailed { .. } => "network.artifact_fetch_failed",
        };
        Some(code)
    }
}
