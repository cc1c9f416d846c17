use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads the entire file into memory.
pub fn slurp_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs_err::read(path).with_context(|| format!("slurp_file({})", path.display()))
}

/// Pretty-printed. Creates any missing parent directories.
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, obj: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }
    fs_err::write(path, serde_json::to_string_pretty(obj)?)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let raw = slurp_file(path)?;
    let obj: T = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing JSON from {}", path.display()))?;
    Ok(obj)
}
