//! autoinstall CLI - Command-line interface
//!
//! Installs third-party packages from URLs into a local directory and
//! inspects what is already installed there.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::install::InstallArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "autoinstall")]
#[command(version)]
#[command(about = "Download, unpack and install third-party packages", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.autoinstall/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package from a URL
    Install(InstallArgs),

    /// Show whether a target is installed from a URL
    Status {
        /// Target name, relative to the install directory
        target_name: String,

        /// URL the target is expected to come from
        url: String,

        /// Install directory
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
    },

    /// Print the URL a target was installed from
    Marker {
        /// Target name, relative to the install directory
        target_name: String,

        /// Install directory
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Keep the guard alive so the log file is flushed on exit.
    let _logging_guard = match autoinstall::logging::init_logging(
        &autoinstall::logging::default_log_dir(),
        autoinstall::logging::default_log_file(),
        cli.verbose,
    ) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(args, cli.config.as_deref()),
        Commands::Status {
            target_name,
            url,
            target_dir,
        } => commands::status::run_status(&target_name, &url, target_dir, cli.config.as_deref()),
        Commands::Marker {
            target_name,
            target_dir,
        } => commands::status::run_marker(&target_name, target_dir, cli.config.as_deref()),
    };

    if let Err(e) = result {
        e.exit();
    }
}
