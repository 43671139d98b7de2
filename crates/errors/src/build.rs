//! Build submission error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("packaging failed: {output}")]
    PackagingFailed { output: String },

    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    #[error("no build id returned by the server")]
    MissingBuildId,

    #[error("invalid build id: {id}")]
    InvalidBuildId { id: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PackagingFailed { .. } => {
                Some("Check that the source directory is readable and tar is installed.")
            }
            Self::SourceNotFound { .. } => {
                Some("Pass an existing directory or tarball with --source.")
            }
            Self::MissingBuildId => {
                Some("The server completed without reporting a build id; check the server logs.")
            }
            Self::InvalidBuildId { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::PackagingFailed { .. } => "build.packaging_failed",
            Self::SourceNotFound { .. } => "build.source_not_found",
            Self::MissingBuildId => "build.missing_build_id",
            Self::InvalidBuildId { .. } => "build.invalid_build_id",
        };
        Some(code)
    }
}
