#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Per-invocation orchestration for remake
//!
//! One build/rebuild/download cycle runs to completion per invocation:
//! package (new builds only), submit, stream the live log, correlate the
//! build id, fetch the artifact. Everything before correlation is fatal on
//! failure; an artifact-fetch failure is reported but leaves the invocation
//! successful, mirroring the behavior of the original tool.

mod context;

pub use context::{OpsCtx, OpsCtxBuilder};

use remake_errors::Error;
use remake_events::{AppEvent, BuildEvent, DownloadEvent, EventEmitter};
use remake_net::{fetch_artifact, submit_build, submit_rebuild, BuildLogStream};
use remake_package::package_source;
use remake_types::{BuildReport, BuildRequest};
use std::path::Path;
use tracing::{debug, warn};

/// Run one build cycle and write the artifact to `output`
///
/// # Errors
///
/// Returns an error if packaging, submission, log streaming or build-id
/// correlation fails. An artifact-fetch failure is not an error: it is
/// reported through events and recorded on the returned report.
pub async fn build(ctx: &OpsCtx, request: BuildRequest, output: &Path) -> Result<BuildReport, Error> {
    let mut stream = submit(ctx, &request).await?;

    // Live build log: forward every chunk as it arrives, buffering nothing
    let tx = ctx.tx.clone();
    stream
        .stream_log(|chunk| tx.emit_log_chunk(chunk))
        .await?;

    // The stream is exhausted; the id header is now trustworthy
    let build_id = stream.build_id()?;
    debug!("build correlated to id {build_id}");
    ctx.tx.emit(AppEvent::Build(BuildEvent::Correlated {
        build_id: build_id.clone(),
    }));

    let url = ctx.endpoint.url_for(&format!("/output/{build_id}"));
    ctx.tx.emit(AppEvent::Download(DownloadEvent::Started {
        url: url.clone(),
        dest: output.to_path_buf(),
    }));

    let mut report = BuildReport {
        build_id,
        output: output.to_path_buf(),
        artifact_size: None,
        artifact_error: None,
    };

    // Fetch failures are reported, not fatal; the build itself succeeded.
    match fetch_artifact(&ctx.net, &ctx.endpoint, &report.build_id, output).await {
        Ok(size) => {
            ctx.tx
                .emit(AppEvent::Download(DownloadEvent::Completed { url, size }));
            report.artifact_size = Some(size);
        }
        Err(e) => {
            warn!("artifact fetch failed: {e}");
            ctx.tx.emit(AppEvent::Download(DownloadEvent::Failed {
                url,
                error: e.to_string(),
            }));
            report.artifact_error = Some(e.to_string());
        }
    }

    Ok(report)
}

/// Package (when needed) and submit the request, returning the live stream
async fn submit(ctx: &OpsCtx, request: &BuildRequest) -> Result<BuildLogStream, Error> {
    match request {
        BuildRequest::New { spec, credentials } => {
            let archive = package_source(&spec.source, &ctx.tx).await?;

            ctx.tx.emit(AppEvent::Build(BuildEvent::Uploading {
                endpoint: ctx.endpoint.clone(),
            }));
            ctx.tx.emit(AppEvent::Build(BuildEvent::Started {
                command: spec.command.clone(),
                endpoint: ctx.endpoint.clone(),
            }));
            submit_build(&ctx.net, &ctx.endpoint, archive.path(), spec, credentials).await
        }
        BuildRequest::Rebuild {
            build_id,
            credentials,
        } => {
            ctx.tx.emit(AppEvent::Build(BuildEvent::RebuildStarted {
                build_id: build_id.clone(),
                endpoint: ctx.endpoint.clone(),
            }));
            submit_rebuild(&ctx.net, &ctx.endpoint, build_id, credentials).await
        }
    }
}
