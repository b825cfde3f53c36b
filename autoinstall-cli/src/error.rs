//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::error::Error;
use std::fmt;
use std::process;

use autoinstall::config::ConfigFileError;
use autoinstall::error::{InstallError, SetupError, StateError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be read or parsed
    ConfigFile(ConfigFileError),
    /// Install root could not be prepared
    Setup(SetupError),
    /// Install failed
    Install(InstallError),
    /// Marker file could not be read
    State(StateError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        let mut cause = self.source();
        while let Some(err) = cause {
            eprintln!("  Caused by: {}", err);
            cause = err.source();
        }

        if let CliError::ConfigFile(_) = self {
            eprintln!();
            eprintln!(
                "Check {} or pass --config <FILE>",
                autoinstall::config::config_file_path().display()
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(_) => write!(f, "Failed to initialize logging"),
            CliError::ConfigFile(_) => write!(f, "Failed to load configuration"),
            CliError::Setup(_) => write!(f, "Failed to set up install directory"),
            CliError::Install(_) => write!(f, "Install failed"),
            CliError::State(_) => write!(f, "Failed to read install marker"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::ConfigFile(e) => Some(e),
            CliError::Setup(e) => Some(e),
            CliError::Install(e) => Some(e),
            CliError::State(e) => Some(e),
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<SetupError> for CliError {
    fn from(e: SetupError) -> Self {
        CliError::Setup(e)
    }
}

impl From<InstallError> for CliError {
    fn from(e: InstallError) -> Self {
        CliError::Install(e)
    }
}

impl From<StateError> for CliError {
    fn from(e: StateError) -> Self {
        CliError::State(e)
    }
}
