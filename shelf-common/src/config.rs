//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "shelf.db";

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `root_folder` key of the module TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    module_name: Option<&str>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(module_name) = module_name {
        if let Ok(config_path) = find_config_file(module_name) {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                        return PathBuf::from(root_folder);
                    }
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of the SQLite database inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Locate the TOML config file for a module
///
/// Linux checks `~/.config/shelf/<module>.toml` first, then
/// `/etc/shelf/<module>.toml`. Other platforms use the user config dir only.
pub fn find_config_file(module_name: &str) -> Result<PathBuf> {
    let file_name = format!("{module_name}.toml");
    let user_config = dirs::config_dir().map(|d| d.join("shelf").join(&file_name));

    if cfg!(target_os = "linux") {
        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/shelf").join(&file_name);
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config(format!("No config file found for {module_name}")));
    }

    let path = user_config
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/shelf
        dirs::data_local_dir()
            .map(|d| d.join("shelf"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/shelf"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/shelf
        dirs::data_dir()
            .map(|d| d.join("shelf"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/shelf"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\shelf
        dirs::data_local_dir()
            .map(|d| d.join("shelf"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\shelf"))
    } else {
        PathBuf::from("./shelf_data")
    }
}
