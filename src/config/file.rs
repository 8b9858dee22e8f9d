//! Reading and writing the TOML config file.

use super::paths::{config_file_path, explicit_config_path};
use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Written above the serialized settings by [`save_config`].
const CONFIG_HEADER: &str = "\
# marksplit configuration
# Run `marksplit config show` to print the values in effect.

";

/// Load `path`, or defaults if it does not exist.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    read_config(path)
}

/// Load the config file in effect for this process.
///
/// A file named by `MARKSPLIT_CONFIG` must exist. The platform file is
/// optional, as is the platform config dir itself.
pub fn load_default_config() -> Result<Config> {
    if let Some(path) = explicit_config_path() {
        return read_config(&path);
    }
    config_file_path().map_or_else(|_| Ok(Config::default()), |path| load_config_file(&path))
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write `config` to `path` with a short header, creating parent dirs.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let write_error = |source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let body = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;
    std::fs::write(path, format!("{CONFIG_HEADER}{body}")).map_err(write_error)
}

/// Write `config` to the file in effect and return its path.
pub fn save_default_config(config: &Config) -> Result<PathBuf> {
    let path = config_file_path()?;
    save_config(config, &path)?;
    Ok(path)
}
