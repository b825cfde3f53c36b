//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::time::Duration;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::mirror::parse_mirror_list;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [installer] section
    if let Some(section) = ini.section(Some("installer")) {
        let path = |key: &str| section.get(key).and_then(non_empty).map(expand_tilde);
        config.installer.target_dir = path("target_dir");
        config.installer.temp_dir = path("temp_dir");
        config.installer.cache_dir = path("cache_dir");

        if let Some(v) = section.get("timeout") {
            let secs: u64 = v
                .trim()
                .parse()
                .map_err(|_| invalid("installer", "timeout", v, "must be a whole number of seconds"))?;
            if secs == 0 {
                return Err(invalid("installer", "timeout", v, "must be greater than 0"));
            }
            config.installer.timeout = Some(Duration::from_secs(secs));
        }

        if let Some(v) = section.get("make_package") {
            let parsed = parse_bool(v)
                .ok_or_else(|| invalid("installer", "make_package", v, "must be true or false"))?;
            config.installer.make_package = Some(parsed);
        }

        if let Some(v) = section.get("package_marker") {
            let v = v.trim();
            if v.is_empty() || v.contains('/') || v.contains('\\') {
                return Err(invalid("installer", "package_marker", v, "must be a plain file name"));
            }
            config.installer.package_marker = Some(v.to_string());
        }
    }

    // [mirrors] section
    if let Some(section) = ini.section(Some("mirrors")) {
        config.mirrors.pypi = section.get("pypi").map(parse_mirror_list);
        config.mirrors.sourceforge = section.get("sourceforge").map(parse_mirror_list);
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
