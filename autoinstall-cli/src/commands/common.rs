//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use autoinstall::config::{config_file_path, ConfigFile};
use autoinstall::InstallerConfig;

use crate::error::CliError;

/// Settings given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub target_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub append_search_path: bool,
    pub prepend_search_path: bool,
    pub no_package: bool,
}

/// Load the configuration file, from `path` or the default location.
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}

/// Resolve settings: CLI flags, then environment, then config file, then defaults.
pub fn resolve_config<F>(file: &ConfigFile, env: F, cli: &ConfigOverrides) -> InstallerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = file.to_installer_config().with_env_overrides(env);

    if let Some(dir) = &cli.target_dir {
        config = config.with_target_dir(dir.clone());
    }
    if cli.temp_dir.is_some() {
        config = config.with_temp_dir(cli.temp_dir.clone());
    }
    if cli.cache_dir.is_some() {
        config = config.with_cache_dir(cli.cache_dir.clone());
    }
    if cli.no_package {
        config = config.with_make_package(false);
    }

    config
        .with_append_to_search_path(cli.append_search_path)
        .with_prepend_to_search_path(cli.prepend_search_path)
}

/// Install directory from the command line, or the config file's.
pub fn resolve_target_dir(cli_target_dir: Option<PathBuf>, file: &ConfigFile) -> PathBuf {
    cli_target_dir.unwrap_or_else(|| file.target_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, contents: &str) -> PathBuf {
        let path = temp.path().join("config.ini");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let file = load_config_file(Some(&temp.path().join("absent.ini"))).unwrap();

        let config = resolve_config(&file, |_| None, &ConfigOverrides::default());

        assert_eq!(config.target_dir, autoinstall::config::default_target_dir());
        assert!(config.make_package);
        assert_eq!(config.cache_dir, None);
    }

    #[test]
    fn test_precedence() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            "[installer]\ntarget_dir = /from/file\ncache_dir = /cache/file\ntemp_dir = /tmp/file\n",
        );
        let file = load_config_file(Some(&path)).unwrap();
        let cli = ConfigOverrides {
            target_dir: Some(PathBuf::from("/from/cli")),
            no_package: true,
            ..Default::default()
        };

        let config = resolve_config(
            &file,
            |key| (key == "LOCAL_AUTOINSTALL_CACHE").then(|| "/cache/env".to_string()),
            &cli,
        );

        assert_eq!(config.target_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/cache/env")));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/file")));
        assert!(!config.make_package);
    }

    #[test]
    fn test_invalid_config_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "[installer]\ntimeout = soon\n");

        assert!(matches!(
            load_config_file(Some(&path)),
            Err(CliError::ConfigFile(_))
        ));
    }

    #[test]
    fn test_resolve_target_dir() {
        let file = ConfigFile::default();
        assert_eq!(
            resolve_target_dir(Some(PathBuf::from("/cli")), &file),
            PathBuf::from("/cli")
        );
        assert_eq!(resolve_target_dir(None, &file), file.target_dir());
    }
}
