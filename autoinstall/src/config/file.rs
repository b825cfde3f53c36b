//! Configuration file handling for ~/.autoinstall/config.ini.
//!
//! Every setting is optional; values present in the file override the
//! built-in defaults and are themselves overridden by the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::InstallerConfig;
use crate::mirror::MirrorConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[installer]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallerSettings {
    pub target_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub make_package: Option<bool>,
    pub package_marker: Option<String>,
}

/// `[mirrors]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSettings {
    pub pypi: Option<Vec<String>>,
    pub sourceforge: Option<Vec<String>>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub installer: InstallerSettings,
    pub mirrors: MirrorSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.autoinstall/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Install root from the file, or the default one.
    pub fn target_dir(&self) -> PathBuf {
        self.installer
            .target_dir
            .clone()
            .unwrap_or_else(default_target_dir)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply_to(&self, mut config: InstallerConfig) -> InstallerConfig {
        let installer = &self.installer;
        if let Some(dir) = &installer.target_dir {
            config.target_dir = dir.clone();
        }
        if installer.temp_dir.is_some() {
            config.temp_dir = installer.temp_dir.clone();
        }
        if installer.cache_dir.is_some() {
            config.cache_dir = installer.cache_dir.clone();
        }
        if let Some(timeout) = installer.timeout {
            config.timeout = timeout;
        }
        if let Some(make_package) = installer.make_package {
            config.make_package = make_package;
        }
        if let Some(marker) = &installer.package_marker {
            config.package_marker = marker.clone();
        }

        let MirrorConfig { sourceforge, pypi } = &mut config.mirrors;
        if let Some(hosts) = &self.mirrors.sourceforge {
            *sourceforge = hosts.clone();
        }
        if let Some(hosts) = &self.mirrors.pypi {
            *pypi = hosts.clone();
        }

        config
    }

    /// Build an installer configuration from this file alone.
    pub fn to_installer_config(&self) -> InstallerConfig {
        self.apply_to(InstallerConfig::new(self.target_dir()))
    }
}

/// Get the config directory path (~/.autoinstall).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".autoinstall")
}

/// Get the path to the config file (~/.autoinstall/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default install root (~/.autoinstall/autoinstalled).
pub fn default_target_dir() -> PathBuf {
    config_directory().join("autoinstalled")
}
