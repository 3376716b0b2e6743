//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Everything Lorebase persists locally lives under ~/.lorebase/.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Lorebase directory (~/.lorebase/)
pub fn lorebase_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".lorebase"))
}

/// Get the config file path (~/.lorebase/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(lorebase_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Lorebase directory, creating it if it doesn't exist
pub fn ensure_lorebase_dir() -> AppResult<PathBuf> {
    let path = lorebase_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
