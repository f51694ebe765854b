//! Per-user config location.

use std::path::PathBuf;

use crate::model::constants::{APP_DIR_NAME, CONFIG_FILE_NAME};

/// Base folder for application data on this OS.
///
/// `%LOCALAPPDATA%` on Windows, `~/Library/Application Support` on macOS,
/// `$XDG_CONFIG_HOME` (or `~/.config`) elsewhere.
fn data_base_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
    } else {
        dirs::config_dir()
    }
}

/// `<base>/PUBG_Map_Overlay`, or `None` if the OS reports no base folder.
pub fn config_dir() -> Option<PathBuf> {
    data_base_dir().map(|mut p| {
        p.push(APP_DIR_NAME);
        p
    })
}

/// `<base>/PUBG_Map_Overlay/config.json`
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|mut p| {
        p.push(CONFIG_FILE_NAME);
        p
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_app_dir() {
        let (Some(path), Some(dir)) = (config_file_path(), config_dir()) else {
            // No home directory on this host
            return;
        };
        assert!(path.ends_with(format!("{APP_DIR_NAME}/{CONFIG_FILE_NAME}")));
        assert_eq!(path.parent(), Some(dir.as_path()));
    }

    #[test]
    fn test_base_dir_is_absolute() {
        if let Some(dir) = config_dir() {
            assert!(dir.is_absolute());
        }
    }
}
