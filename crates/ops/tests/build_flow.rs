//! End-to-end flow tests against a mock build server

use httpmock::prelude::*;
use remake_errors::{BuildError, Error};
use remake_events::{channel, AppEvent, BuildEvent, DownloadEvent, EventReceiver};
use remake_net::NetClient;
use remake_ops::{build, OpsCtxBuilder};
use remake_types::{BuildId, BuildRequest, BuildSpec, Credentials, ServerEndpoint};

fn ctx_for(server: &MockServer) -> (remake_ops::OpsCtx, EventReceiver) {
    let (tx, rx) = channel();
    let ctx = OpsCtxBuilder::new()
        .with_endpoint(ServerEndpoint::new(server.host(), server.port()))
        .with_net(NetClient::with_defaults().unwrap())
        .with_event_sender(tx)
        .build()
        .unwrap();
    (ctx, rx)
}

fn drain(mut rx: EventReceiver) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_build_cycle() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/make");
        then.status(200)
            .header("X-Make-Id", "42")
            .body("compiling...\ndone\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/output/42");
        then.status(200).body("TARBALL_BYTES");
    });

    // source directory with one file
    let source = tempfile::tempdir().unwrap();
    tokio::fs::write(source.path().join("main.c"), "int main(){}")
        .await
        .unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("proj.tgz");

    let (ctx, rx) = ctx_for(&server);
    let request = BuildRequest::New {
        spec: BuildSpec::new(source.path().to_path_buf(), None, None, None),
        credentials: Credentials::new("s3cret"),
    };

    let report = build(&ctx, request, &output).await.unwrap();

    assert_eq!(report.build_id, BuildId::new("42").unwrap());
    assert_eq!(report.artifact_size, Some("TARBALL_BYTES".len() as u64));
    assert!(report.artifact_error.is_none());

    let contents = tokio::fs::read(&output).await.unwrap();
    assert_eq!(contents, b"TARBALL_BYTES");

    // the whole log is forwarded, and before the download starts
    let events = drain(rx);
    let mut log = Vec::new();
    let mut last_chunk_idx = None;
    let mut download_started_idx = None;
    for (i, event) in events.iter().enumerate() {
        match event {
            AppEvent::Build(BuildEvent::LogChunk { bytes }) => {
                log.extend_from_slice(bytes);
                last_chunk_idx = Some(i);
            }
            AppEvent::Download(DownloadEvent::Started { .. }) => {
                download_started_idx = Some(i);
            }
            _ => {}
        }
    }
    assert_eq!(log, b"compiling...\ndone\n");
    assert!(last_chunk_idx.unwrap() < download_started_idx.unwrap());
}

#[tokio::test]
async fn test_rebuild_without_build_id_never_opens_output() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/rebuild/7");
        then.status(200).body("rebuild log\n");
    });

    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("out.tgz");

    let (ctx, rx) = ctx_for(&server);
    let request = BuildRequest::Rebuild {
        build_id: BuildId::new("7").unwrap(),
        credentials: Credentials::new("s3cret"),
    };

    let err = build(&ctx, request, &output).await.unwrap_err();
    assert!(matches!(err, Error::Build(BuildError::MissingBuildId)));
    assert!(!output.exists());

    // no download event was ever emitted
    let events = drain(rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, AppEvent::Download(_))));
}

#[tokio::test]
async fn test_artifact_fetch_failure_is_not_fatal() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/rebuild/9");
        then.status(200).header("X-Make-Id", "9").body("cached\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/output/9");
        then.status(500).body("storage offline");
    });

    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("out.tgz");

    let (ctx, rx) = ctx_for(&server);
    let request = BuildRequest::Rebuild {
        build_id: BuildId::new("9").unwrap(),
        credentials: Credentials::new("s3cret"),
    };

    // correlation succeeded, so the invocation succeeds
    let report = build(&ctx, request, &output).await.unwrap();
    assert_eq!(report.build_id, BuildId::new("9").unwrap());
    assert!(report.artifact_size.is_none());
    assert!(report.artifact_error.is_some());

    let events = drain(rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::Download(DownloadEvent::Failed { .. }))));
}

#[tokio::test]
async fn test_packaging_failure_sends_no_request() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/make");
        then.status(200).header("X-Make-Id", "1");
    });

    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("out.tgz");

    let (ctx, _rx) = ctx_for(&server);
    let request = BuildRequest::New {
        spec: BuildSpec::new("/nonexistent/project".into(), None, None, None),
        credentials: Credentials::new("s3cret"),
    };

    let err = build(&ctx, request, &output).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Build(BuildError::SourceNotFound { .. })
    ));
    mock.assert_hits(0);
}
