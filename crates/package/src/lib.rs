#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Source packaging for remake
//!
//! Turns a source location into a single compressed archive ready for
//! upload. Directories are archived with the external `tar` binary inside a
//! scoped temporary directory; existing tarballs are used as-is.

use remake_errors::{BuildError, Error};
use remake_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use remake_types::ARCHIVE_FILE_NAME;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

/// Archive produced by [`package_source`]
///
/// Owns the temporary packaging directory when one was created; dropping
/// the value removes the scaffolding, whether the upload happened or not.
#[derive(Debug)]
pub struct SourceArchive {
    path: PathBuf,
    _temp: Option<TempDir>,
}

impl SourceArchive {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Package a source location into an archive stream
///
/// A directory is archived into `input.tgz` inside a fresh temporary
/// directory; a file is assumed to already be an archive and used directly
/// with no copy.
///
/// # Errors
///
/// Returns `BuildError::SourceNotFound` if the location does not exist and
/// `BuildError::PackagingFailed` with the tar diagnostic if the archiving
/// step exits non-zero. No request is sent in either case.
pub async fn package_source(source: &Path, tx: &EventSender) -> Result<SourceArchive, Error> {
    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|_| BuildError::SourceNotFound {
            path: source.display().to_string(),
        })?;

    if !metadata.is_dir() {
        debug!("using existing archive {}", source.display());
        return Ok(SourceArchive {
            path: source.to_path_buf(),
            _temp: None,
        });
    }

    let temp = TempDir::new()?;
    let archive = temp.path().join(ARCHIVE_FILE_NAME);

    tx.emit(AppEvent::Build(BuildEvent::Packaging {
        source: source.to_path_buf(),
        archive: archive.clone(),
    }));

    let output = Command::new("tar")
        .arg("czf")
        .arg(&archive)
        .arg(".")
        .current_dir(source)
        .output()
        .await
        .map_err(|e| BuildError::PackagingFailed {
            output: format!("failed to run tar: {e}"),
        })?;

    if !output.status.success() {
        let mut diagnostic = String::from_utf8_lossy(&output.stderr).to_string();
        if diagnostic.is_empty() {
            diagnostic = String::from_utf8_lossy(&output.stdout).to_string();
        }
        return Err(BuildError::PackagingFailed { output: diagnostic }.into());
    }

    Ok(SourceArchive {
        path: archive,
        _temp: Some(temp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use remake_events::channel;

    #[tokio::test]
    async fn test_package_directory() {
        let source = tempfile::tempdir().unwrap();
        tokio::fs::write(source.path().join("hello.c"), "int main() { return 0; }")
            .await
            .unwrap();

        let (tx, mut rx) = channel();
        let archive = package_source(source.path(), &tx).await.unwrap();
        assert!(archive.path().exists());
        assert_eq!(archive.path().file_name().unwrap(), "input.tgz");

        // exactly one packaging event, naming the source
        let mut saw_packaging = false;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Build(BuildEvent::Packaging { source: s, .. }) = event {
                assert_eq!(s, source.path());
                saw_packaging = true;
            }
        }
        assert!(saw_packaging);

        // scaffolding is removed once the archive is dropped
        let temp_path = archive.path().parent().unwrap().to_path_buf();
        drop(archive);
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_existing_archive_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let tarball = dir.path().join("source.tgz");
        tokio::fs::write(&tarball, b"fake tarball").await.unwrap();

        let (tx, mut rx) = channel();
        let archive = package_source(&tarball, &tx).await.unwrap();
        assert_eq!(archive.path(), tarball);

        // no packaging step, no event
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let (tx, _rx) = channel();
        let err = package_source(Path::new("/nonexistent/project"), &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::SourceNotFound { .. })
        ));
    }
}
