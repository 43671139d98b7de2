#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in remake
//!
//! All user-visible output goes through events - no direct logging or
//! printing happens outside the CLI. Components push events into an
//! unbounded channel; the CLI drains it concurrently with the running
//! operation and renders each event in order.

use remake_types::{BuildId, ServerEndpoint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Build submission lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// Local directory is being packaged into a tarball
    Packaging { source: PathBuf, archive: PathBuf },

    /// Source archive upload is starting
    Uploading { endpoint: ServerEndpoint },

    /// The server accepted the request and is running the build command
    Started {
        command: String,
        endpoint: ServerEndpoint,
    },

    /// A rebuild of a prior id was submitted
    RebuildStarted {
        build_id: BuildId,
        endpoint: ServerEndpoint,
    },

    /// One chunk of the server's live build log, verbatim bytes
    LogChunk { bytes: Vec<u8> },

    /// The log stream ended and the build id was correlated
    Correlated { build_id: BuildId },
}

/// Artifact retrieval events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Artifact download is starting
    Started { url: String, dest: PathBuf },

    /// Artifact download finished
    Completed { url: String, size: u64 },

    /// Artifact download failed; the invocation continues regardless
    Failed { url: String, error: String },
}

/// General-purpose events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    DebugLog { message: String },
    Warning { message: String },
}

/// Top-level event type carried on the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain")]
pub enum AppEvent {
    Build(BuildEvent),
    Download(DownloadEvent),
    General(GeneralEvent),
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout the remake system
///
/// Provides a single API for emitting events regardless of whether the
/// caller holds a raw `EventSender` or a struct containing one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if the receiver is gone we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::DebugLog {
            message: message.into(),
        }));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::Warning {
            message: message.into(),
        }));
    }

    /// Emit one raw build-log chunk
    fn emit_log_chunk(&self, bytes: &[u8]) {
        self.emit(AppEvent::Build(BuildEvent::LogChunk {
            bytes: bytes.to_vec(),
        }));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_preserves_order() {
        let (tx, mut rx) = channel();
        tx.emit_log_chunk(b"compiling...\n");
        tx.emit_log_chunk(b"done\n");
        tx.emit_warning("late warning");

        let mut chunks = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Build(BuildEvent::LogChunk { bytes }) = event {
                chunks.extend_from_slice(&bytes);
            }
        }
        assert_eq!(chunks, b"compiling...\ndone\n");
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_debug("nobody listening");
    }
}
