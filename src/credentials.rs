use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ShapeError;

const API_KEY_FILE: &str = ".textshaper-apikey";

pub fn api_key_path() -> Result<PathBuf, ShapeError> {
    dirs::home_dir()
        .map(|home| home.join(API_KEY_FILE))
        .ok_or(ShapeError::NoHomeDir)
}

pub fn load_api_key() -> Result<String, ShapeError> {
    read_api_key(&api_key_path()?)
}

/// Reads the raw key, dropping at most one trailing newline.
pub fn read_api_key(path: &Path) -> Result<String, ShapeError> {
    let raw = fs::read_to_string(path).map_err(|source| ShapeError::Credential {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw.strip_suffix('\n').unwrap_or(&raw).to_string())
}
