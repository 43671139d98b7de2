#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Wire protocol client for the remote build server
//!
//! This crate handles the HTTP side of a build cycle: multipart submission
//! of new builds and rebuilds, chunked consumption of the live build log,
//! build-id correlation from the response headers, and artifact retrieval.

mod client;

pub use client::{NetClient, NetConfig};
pub use remake_types::BUILD_ID_HEADER;

use remake_errors::{BuildError, Error, NetworkError};
use remake_types::{BuildId, BuildSpec, Credentials, ServerEndpoint, ARCHIVE_FILE_NAME};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Live response to a build or rebuild submission
///
/// The body is a finite, non-restartable sequence of log chunks. The build
/// id header may only be trusted once the stream has been exhausted: the
/// server assigns it when the build completes.
#[derive(Debug)]
pub struct BuildLogStream {
    response: Response,
}

impl BuildLogStream {
    /// Consume the body one chunk at a time, forwarding each chunk to the
    /// callback as it arrives. The whole body is never buffered; chunks
    /// already forwarded are not retracted on a later failure.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::StreamInterrupted` on a mid-stream read
    /// failure.
    pub async fn stream_log<F>(&mut self, mut on_chunk: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        while let Some(chunk) =
            self.response
                .chunk()
                .await
                .map_err(|e| NetworkError::StreamInterrupted {
                    message: e.to_string(),
                })?
        {
            on_chunk(&chunk);
        }
        Ok(())
    }

    /// Extract the build id from the response headers
    ///
    /// Valid to call once [`stream_log`](Self::stream_log) has exhausted the
    /// body.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingBuildId` if the header is absent or
    /// empty. This is fatal for the invocation: without an id there is no
    /// artifact to fetch.
    pub fn build_id(&self) -> Result<BuildId, Error> {
        let value = self
            .response
            .headers()
            .get(BUILD_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(BuildError::MissingBuildId)?;
        if value.is_empty() {
            return Err(BuildError::MissingBuildId.into());
        }
        BuildId::new(value)
    }
}

/// Submit a new build: upload the packaged source and start the command
///
/// The multipart body carries exactly the fields `code`, `command`,
/// `prefix` and `secret`; the archive is streamed from disk, never loaded
/// into memory.
///
/// # Errors
///
/// Returns `NetworkError::ConnectionFailed` naming the endpoint if the
/// server cannot be reached, or an I/O error if the archive cannot be
/// opened.
pub async fn submit_build(
    client: &NetClient,
    endpoint: &ServerEndpoint,
    archive: &Path,
    spec: &BuildSpec,
    credentials: &Credentials,
) -> Result<BuildLogStream, Error> {
    let form = Form::new()
        .part("code", archive_part(archive).await?)
        .text("command", spec.command.clone())
        .text("prefix", spec.prefix.clone())
        .text("secret", credentials.secret.clone());

    send_multipart(client, endpoint, "/make", form).await
}

/// Submit a rebuild of a previously built id
///
/// The body carries only `secret`; the target id is part of the request
/// path.
///
/// # Errors
///
/// Returns `NetworkError::ConnectionFailed` naming the endpoint if the
/// server cannot be reached.
pub async fn submit_rebuild(
    client: &NetClient,
    endpoint: &ServerEndpoint,
    build_id: &BuildId,
    credentials: &Credentials,
) -> Result<BuildLogStream, Error> {
    let form = Form::new().text("secret", credentials.secret.clone());
    let path = format!("/rebuild/{build_id}");

    send_multipart(client, endpoint, &path, form).await
}

/// Fetch the build artifact for an id and write it verbatim to `dest`
///
/// The destination is created (truncating any existing content) only after
/// the server has answered successfully, so a failed fetch never clobbers
/// an existing file with nothing.
///
/// # Errors
///
/// Returns `NetworkError::ArtifactFetchFailed` on any network, server or
/// write failure. The caller decides whether that is fatal.
pub async fn fetch_artifact(
    client: &NetClient,
    endpoint: &ServerEndpoint,
    build_id: &BuildId,
    dest: &Path,
) -> Result<u64, Error> {
    let url = endpoint.url_for(&format!("/output/{build_id}"));
    debug!("fetching artifact from {url}");

    let mut response = client
        .inner()
        .get(&url)
        .send()
        .await
        .map_err(|e| NetworkError::ArtifactFetchFailed {
            url: url.clone(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(NetworkError::ArtifactFetchFailed {
            url,
            message: format!("HTTP {}", response.status()),
        }
        .into());
    }

    let mut file = File::create(dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;
    let mut written = 0u64;

    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| NetworkError::ArtifactFetchFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let Some(chunk) = chunk else { break };
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| Error::io_with_path(&e, dest))?;
    Ok(written)
}

/// Build the streamed `code` part from the packaged archive
async fn archive_part(archive: &Path) -> Result<Part, Error> {
    let file = File::open(archive)
        .await
        .map_err(|e| Error::io_with_path(&e, archive))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| Error::io_with_path(&e, archive))?
        .len();

    Part::stream_with_length(Body::from(file), length)
        .file_name(ARCHIVE_FILE_NAME)
        .mime_str("application/octet-stream")
        .map_err(|e| Error::internal(format!("invalid content type: {e}")))
}

async fn send_multipart(
    client: &NetClient,
    endpoint: &ServerEndpoint,
    path: &str,
    form: Form,
) -> Result<BuildLogStream, Error> {
    let url = endpoint.url_for(path);
    debug!("POST {url}");

    let response = client
        .inner()
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| NetworkError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

    Ok(BuildLogStream { response })
}
