//! remake - build software on a remote build server
//!
//! This is the CLI application that drives one build/rebuild/download
//! cycle through the ops crate.

mod cli;
mod error;
mod events;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use remake_config::Config;
use remake_events::{EventReceiver, EventSender};
use remake_net::NetClient;
use remake_ops::{OpsCtx, OpsCtxBuilder};
use remake_types::{BuildId, BuildReport, BuildRequest, BuildSpec};
use std::path::PathBuf;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("invocation failed: {}", e);
        eprintln!("!! {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("starting remake v{}", env!("CARGO_PKG_VERSION"));

    // Configuration precedence: file, then environment, then CLI flags
    let mut config = Config::load_or_default(&cli.global.config).await?;
    config.merge_env();
    if let Some(server) = &cli.global.server {
        config.server_override = Some(server.clone());
    }

    match cli.command {
        Commands::Build {
            source,
            name,
            command,
            prefix,
            output,
            rebuild,
        } => {
            let endpoint = config.endpoint()?;
            let credentials = config.credentials()?;

            let source = match source {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            let name = name.unwrap_or_else(|| BuildSpec::name_from_source(&source));
            let output = output.unwrap_or_else(|| BuildSpec::default_output(&name));

            // The request variant is fixed here, before any network I/O
            let request = match rebuild {
                Some(id) => {
                    if id.is_empty() {
                        return Err(CliError::InvalidArguments(
                            "rebuild id cannot be empty".to_string(),
                        ));
                    }
                    BuildRequest::Rebuild {
                        build_id: BuildId::new(id)?,
                        credentials,
                    }
                }
                None => BuildRequest::New {
                    spec: BuildSpec::new(source, Some(name), prefix, command),
                    credentials,
                },
            };

            let (event_sender, event_receiver) = remake_events::channel();
            let ctx = build_ops_context(endpoint, event_sender)?;

            let colors_enabled = console::Term::stdout().features().colors_supported();
            let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug);

            let report =
                execute_with_events(ctx, request, output, event_receiver, &mut event_handler)
                    .await?;

            info!("build {} completed", report.build_id);
            Ok(())
        }
    }
}

/// Execute the build with concurrent event handling
async fn execute_with_events(
    ctx: OpsCtx,
    request: BuildRequest,
    output: PathBuf,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<BuildReport, CliError> {
    let mut command_future = Box::pin(remake_ops::build(&ctx, request, &output));

    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result.map_err(Into::into);
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    // All senders gone: nothing left to render
                    None => break,
                }
            }
        }
    }

    command_future.await.map_err(Into::into)
}

/// Build the operations context for this invocation
fn build_ops_context(
    endpoint: remake_types::ServerEndpoint,
    event_sender: EventSender,
) -> Result<OpsCtx, CliError> {
    let ctx = OpsCtxBuilder::new()
        .with_endpoint(endpoint)
        .with_net(NetClient::with_defaults()?)
        .with_event_sender(event_sender)
        .build()?;

    Ok(ctx)
}

/// Initialize tracing/logging
fn init_tracing(debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,remake=debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}
