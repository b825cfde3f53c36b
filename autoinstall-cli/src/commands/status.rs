//! `status` and `marker` commands.
//!
//! Both only read the install directory; nothing is created or downloaded.

use std::path::{Path, PathBuf};

use autoinstall::state::InstallMarkers;
use autoinstall::target::{TargetDirectory, DEFAULT_PACKAGE_MARKER};

use super::common::{load_config_file, resolve_target_dir};
use crate::error::CliError;

/// Install state of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// Recorded URL matches and the target exists.
    Installed,
    /// Installed, but from another URL.
    Outdated { recorded: String },
    /// A marker exists but the target itself is gone.
    Missing,
    NotInstalled,
}

/// Work out the install state of `target_name` against `url`.
pub fn target_status(root: &Path, target_name: &str, url: &str) -> Result<TargetStatus, CliError> {
    let markers = InstallMarkers::new(root);
    let target_path = TargetDirectory::new(root, DEFAULT_PACKAGE_MARKER).target_path(target_name);

    let status = match markers.recorded_url(target_name)? {
        None => TargetStatus::NotInstalled,
        Some(_) if !target_path.exists() => TargetStatus::Missing,
        Some(_) if markers.is_installed(target_name, url)? => TargetStatus::Installed,
        Some(recorded) => TargetStatus::Outdated { recorded },
    };

    Ok(status)
}

/// Run the status command.
pub fn run_status(
    target_name: &str,
    url: &str,
    target_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<(), CliError> {
    let file = load_config_file(config_path)?;
    let root = resolve_target_dir(target_dir, &file);

    match target_status(&root, target_name, url)? {
        TargetStatus::Installed => println!("{}: installed from {}", target_name, url),
        TargetStatus::Outdated { recorded } => {
            println!("{}: installed from a different URL", target_name);
            println!("  Recorded: {}", recorded);
        }
        TargetStatus::Missing => println!("{}: marker present but target missing", target_name),
        TargetStatus::NotInstalled => println!("{}: not installed", target_name),
    }

    Ok(())
}

/// Run the marker command.
pub fn run_marker(
    target_name: &str,
    target_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<(), CliError> {
    let file = load_config_file(config_path)?;
    let root = resolve_target_dir(target_dir, &file);

    match InstallMarkers::new(&root).recorded_url(target_name)? {
        Some(url) => println!("{}", url),
        None => println!("(not installed)"),
    }

    Ok(())
}
