//! Path utilities for Event Horizon directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const HORIZON_DIR: &str = ".horizon";
const DATABASE_FILE: &str = "horizon.db";
const PREVIEWS_DIR: &str = "previews";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the data directory.
pub const HORIZON_DIR_ENV: &str = "HORIZON_DIR";

/// Resolve the data directory.
/// Priority: HORIZON_DIR env var > ~/.horizon/
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HORIZON_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(HORIZON_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the data directory exists and return its path.
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = resolve_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(DATABASE_FILE))
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(LOGS_DIR))
}

/// Live preview file for a project: <data_dir>/previews/<id>.html
pub fn preview_path(project_id: &str) -> Result<PathBuf> {
    Ok(resolve_data_dir()?
        .join(PREVIEWS_DIR)
        .join(format!("{project_id}.html")))
}
