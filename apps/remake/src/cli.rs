//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// remake - build software on a remote build server
#[derive(Parser)]
#[command(name = "remake")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build software on a remote build server")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Full build server URL, overriding the configured app
    #[arg(long, global = true, env = "MAKE_SERVER", value_name = "URL")]
    pub server: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a piece of software for the remote build server
    ///
    /// If no COMMAND is specified, a sensible default will be chosen.
    Build {
        /// The source directory or tarball to build from
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// The name of the library (defaults to the source directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// The command to run for compilation
        #[arg(short, long)]
        command: Option<String>,

        /// The build/install --prefix of the software
        #[arg(short, long)]
        prefix: Option<String>,

        /// Output build artifacts to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rebuild the provided id instead of uploading source
        #[arg(short, long, value_name = "ID")]
        rebuild: Option<String>,
    },
}
