#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core types shared across the remake crates

use remake_errors::{BuildError, Error, NetworkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Fixed file name for the uploaded source archive
pub const ARCHIVE_FILE_NAME: &str = "input.tgz";

/// Response header carrying the build id for build/rebuild requests
pub const BUILD_ID_HEADER: &str = "X-Make-Id";

/// One build submission: where the source lives and how to compile it.
///
/// Immutable once constructed; defaults follow the conventions of the
/// build server (`/app/vendor` install prefix, configure-and-make command).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Source directory or existing tarball
    pub source: PathBuf,
    /// Shell command the server runs to compile the source
    pub command: String,
    /// Install prefix the build is configured with
    pub prefix: String,
}

impl BuildSpec {
    /// Create a spec from caller-supplied options, filling in defaults.
    ///
    /// `name` defaults to the basename of `source`; `prefix` to
    /// `/app/vendor/{name}`; `command` to a configure/make-install
    /// invocation parameterized by the prefix.
    #[must_use]
    pub fn new(
        source: PathBuf,
        name: Option<String>,
        prefix: Option<String>,
        command: Option<String>,
    ) -> Self {
        let name = name.unwrap_or_else(|| Self::name_from_source(&source));
        let prefix = prefix.unwrap_or_else(|| format!("/app/vendor/{name}"));
        let command =
            command.unwrap_or_else(|| format!("./configure --prefix {prefix} && make install"));
        Self {
            source,
            command,
            prefix,
        }
    }

    /// Derive the artifact name from the source location
    #[must_use]
    pub fn name_from_source(source: &Path) -> String {
        source
            .file_name()
            .map_or_else(|| "build".to_string(), |n| n.to_string_lossy().to_string())
    }

    /// Default output path for the fetched artifact
    #[must_use]
    pub fn default_output(name: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/{name}.tgz"))
    }
}

/// Resolved address of the build server, fixed for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse an endpoint from a full server URL (plain HTTP)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or has no host.
    pub fn from_url(url: &str) -> Result<Self, Error> {
        let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| NetworkError::InvalidUrl(format!("no host in {url}")))?
            .to_string();
        let port = parsed.port().unwrap_or(80);
        Ok(Self { host, port })
    }

    /// Build a full URL for a server path like `/make`
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Shared secret attached to every request; loaded from config, never
/// generated here.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Opaque correlation token identifying one build attempt on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildId(String);

impl BuildId {
    /// Wrap a build id, rejecting empty values
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidBuildId` for an empty id.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(BuildError::InvalidBuildId { id }.into());
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The one request this invocation performs, chosen before any network I/O.
///
/// Modeled as a sum type so the new-build fields and the rebuild id can
/// never be mixed into one request.
#[derive(Debug, Clone)]
pub enum BuildRequest {
    /// Upload the packaged source and build it
    New {
        spec: BuildSpec,
        credentials: Credentials,
    },
    /// Re-run a previously submitted build by id, without re-uploading
    Rebuild {
        build_id: BuildId,
        credentials: Credentials,
    },
}

impl BuildRequest {
    /// Request path on the build server
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::New { .. } => "/make".to_string(),
            Self::Rebuild { build_id, .. } => format!("/rebuild/{build_id}"),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        match self {
            Self::New { credentials, .. } | Self::Rebuild { credentials, .. } => credentials,
        }
    }
}

/// Outcome of one build invocation
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Correlation id the server assigned to this build
    pub build_id: BuildId,
    /// Where the artifact was written
    pub output: PathBuf,
    /// Bytes written to the output file, when the fetch succeeded
    pub artifact_size: Option<u64>,
    /// Artifact fetch failure, reported but not fatal
    pub artifact_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_spec_defaults() {
        let spec = BuildSpec::new(PathBuf::from("./proj"), None, None, None);
        assert_eq!(spec.prefix, "/app/vendor/proj");
        assert_eq!(spec.command, "./configure --prefix /app/vendor/proj && make install");
    }

    #[test]
    fn test_build_spec_explicit_options_win() {
        let spec = BuildSpec::new(
            PathBuf::from("/src/libfoo"),
            Some("foo".to_string()),
            Some("/opt/foo".to_string()),
            Some("make".to_string()),
        );
        assert_eq!(spec.prefix, "/opt/foo");
        assert_eq!(spec.command, "make");
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            BuildSpec::default_output("proj"),
            PathBuf::from("/tmp/proj.tgz")
        );
    }

    #[test]
    fn test_endpoint_from_url() {
        let ep = ServerEndpoint::from_url("http://build.example.com:5000").unwrap();
        assert_eq!(ep.host, "build.example.com");
        assert_eq!(ep.port, 5000);
        assert_eq!(ep.url_for("/make"), "http://build.example.com:5000/make");

        let ep = ServerEndpoint::from_url("http://app.herokuapp.com").unwrap();
        assert_eq!(ep.port, 80);

        assert!(ServerEndpoint::from_url("not a url").is_err());
    }

    #[test]
    fn test_request_paths() {
        let creds = Credentials::new("s3cret");
        let rebuild = BuildRequest::Rebuild {
            build_id: BuildId::new("7").unwrap(),
            credentials: creds.clone(),
        };
        assert_eq!(rebuild.path(), "/rebuild/7");

        let new = BuildRequest::New {
            spec: BuildSpec::new(PathBuf::from("proj"), None, None, None),
            credentials: creds,
        };
        assert_eq!(new.path(), "/make");
    }

    #[test]
    fn test_build_id_rejects_empty() {
        assert!(BuildId::new("").is_err());
        assert_eq!(BuildId::new("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
