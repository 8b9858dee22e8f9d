//! Config file location: `MARKSPLIT_CONFIG`, else the platform config dir.

use crate::constants::APP_NAME;
use crate::constants::config::{CONFIG_ENV, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

/// Platform configuration directory.
///
/// - Linux: `~/.config/marksplit/`
/// - macOS: `~/Library/Application Support/marksplit/`
/// - Windows: `%APPDATA%\marksplit\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Config file named by `MARKSPLIT_CONFIG`, if set and non-empty.
pub fn explicit_config_path() -> Option<PathBuf> {
    explicit_from(std::env::var_os(CONFIG_ENV))
}

/// Config file used by this process: the explicit one, else
/// `config.toml` in [`config_dir`].
pub fn config_file_path() -> Result<PathBuf> {
    match explicit_config_path() {
        Some(path) => Ok(path),
        None => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

fn explicit_from(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_app_specific() {
        let path = config_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_NAME));
    }

    #[test]
    fn test_explicit_path_ignores_empty_value() {
        assert_eq!(explicit_from(None), None);
        assert_eq!(explicit_from(Some(OsString::new())), None);
        assert_eq!(
            explicit_from(Some(OsString::from("/etc/marksplit.toml"))),
            Some(PathBuf::from("/etc/marksplit.toml"))
        );
    }

    #[test]
    fn test_default_file_lives_in_config_dir() {
        if explicit_config_path().is_some() {
            return;
        }
        let path = config_file_path().unwrap();
        assert_eq!(path.parent().unwrap(), config_dir().unwrap());
        assert!(path.ends_with(CONFIG_FILE_NAME));
    }
}
