//! `install` command.

use std::path::{Path, PathBuf};

use autoinstall::target::Placement;
use autoinstall::{AutoInstaller, InstallOutcome, PackageSpec, SearchPath};
use clap::Args;
use tracing::debug;

use super::common::{load_config_file, resolve_config, ConfigOverrides};
use crate::error::CliError;

/// Arguments for `autoinstall install`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// URL of the file or archive to install
    pub url: String,

    /// Path inside the downloaded archive to install
    #[arg(long, value_name = "PATH")]
    pub subpath: Option<String>,

    /// Name to install under (default: last component of --subpath)
    #[arg(long, value_name = "NAME")]
    pub target_name: Option<String>,

    /// File to delete before installing, relative to --subpath (repeatable)
    #[arg(long = "remove", value_name = "FILE")]
    pub files_to_remove: Vec<String>,

    /// Reinstall even if already installed from this URL
    #[arg(long)]
    pub refresh: bool,

    /// Install directory (default: ~/.autoinstall/autoinstalled)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Directory for scratch space (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Local download cache
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Report the install directory as appended to the search path
    #[arg(long)]
    pub append_search_path: bool,

    /// Report the install directory as prepended to the search path
    #[arg(long)]
    pub prepend_search_path: bool,

    /// Don't mark the install directory as a package
    #[arg(long)]
    pub no_package: bool,
}

impl InstallArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_dir: self.target_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            append_search_path: self.append_search_path,
            prepend_search_path: self.prepend_search_path,
            no_package: self.no_package,
        }
    }

    fn spec(&self) -> PackageSpec {
        let mut spec = PackageSpec::new(&self.url)
            .with_files_to_remove(self.files_to_remove.iter().cloned())
            .with_refresh(self.refresh);
        if let Some(subpath) = &self.subpath {
            spec = spec.with_subpath(subpath);
        }
        if let Some(name) = &self.target_name {
            spec = spec.with_target_name(name);
        }
        spec
    }
}

/// Run the install command.
pub fn run(args: InstallArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let file = load_config_file(config_path)?;
    let config = resolve_config(&file, |key| std::env::var(key).ok(), &args.overrides());
    debug!(
        target_dir = %config.target_dir.display(),
        cache_dir = ?config.cache_dir,
        "Resolved installer configuration"
    );

    let installer = AutoInstaller::new(config)?;
    let mut search_path = SearchPath::new();
    if let Some(entry) = installer.register_search_path(&mut search_path) {
        let placement = match entry.placement {
            Placement::Appended => "append",
            Placement::Prepended => "prepend",
        };
        println!("Search path ({}): {}", placement, entry.path.display());
    }

    match installer.install(&args.spec())? {
        InstallOutcome::AlreadyInstalled { target_path } => {
            println!("Already installed: {}", target_path.display());
        }
        InstallOutcome::Installed {
            target_path,
            served_by,
            from_cache,
            ..
        } => {
            println!("Installed: {}", target_path.display());
            if from_cache {
                println!("  Source: local cache");
            } else if let Some(url) = served_by {
                println!("  Source: {}", url);
            }
        }
    }

    Ok(())
}
