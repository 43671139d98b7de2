//! Event rendering for the CLI
//!
//! The build log is printed verbatim as chunks arrive; status lines around
//! it follow the `>> message` style of the original tool.

use console::style;
use remake_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent};
use std::io::Write;

/// Renders events to the terminal in arrival order
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Build(event) => self.handle_build_event(event),
            AppEvent::Download(event) => self.handle_download_event(event),
            AppEvent::General(event) => self.handle_general_event(event),
        }
    }

    fn handle_build_event(&mut self, event: BuildEvent) {
        match event {
            BuildEvent::Packaging { archive, .. } => {
                self.status(&format!(
                    "Packaging local directory to {}",
                    archive.display()
                ));
            }
            BuildEvent::Uploading { .. } => {
                self.status("Uploading code for build");
            }
            BuildEvent::Started { command, endpoint } => {
                self.status(&format!("Building with: {command} on {endpoint}"));
            }
            BuildEvent::RebuildStarted { build_id, endpoint } => {
                self.status(&format!("Rebuilding {build_id} on {endpoint}"));
            }
            BuildEvent::LogChunk { bytes } => {
                // Raw server log, forwarded verbatim
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(&bytes);
                let _ = stdout.flush();
            }
            BuildEvent::Correlated { build_id } => {
                if self.debug_enabled {
                    eprintln!("build id: {build_id}");
                }
            }
        }
    }

    fn handle_download_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { url, dest } => {
                self.status(&format!(
                    "Downloading build artifacts {url} to: {}",
                    dest.display()
                ));
            }
            DownloadEvent::Completed { .. } => {}
            DownloadEvent::Failed { error, .. } => {
                self.error(&error);
            }
        }
    }

    fn handle_general_event(&mut self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message } => self.error(&message),
            GeneralEvent::DebugLog { message } => {
                if self.debug_enabled {
                    eprintln!("{message}");
                }
            }
        }
    }

    fn status(&self, message: &str) {
        if self.colors_enabled {
            println!("{} {message}", style(">>").bold().cyan());
        } else {
            println!(">> {message}");
        }
    }

    fn error(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("!!").bold().red());
        } else {
            eprintln!("!! {message}");
        }
    }
}
