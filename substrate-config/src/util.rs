use std::path::{Path, PathBuf};

use crate::error::ConfigLoadError;

/// Expand a leading `~` to the user's home directory, the way the teacher's
/// CLI flags accept `~`-prefixed cache paths.
pub fn expand_tilde(field: &'static str, path: &Path) -> Result<PathBuf, ConfigLoadError> {
    let as_str = path.to_string_lossy();
    if let Some(rest) = as_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| ConfigLoadError::PathExpansion {
            field,
            path: as_str.to_string(),
        })?;
        Ok(home.join(rest))
    } else if as_str == "~" {
        dirs::home_dir().ok_or_else(|| ConfigLoadError::PathExpansion {
            field,
            path: as_str.to_string(),
        })
    } else {
        Ok(path.to_path_buf())
    }
}

/// Default location for the layered config file: `~/.substrate/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".substrate")
        .join("config.toml")
}
