//! Shared utility functions for codestash crates

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Expand `~` and environment variables in a configured path.
///
/// Relative results are resolved against `base_dir`, the directory holding
/// the configuration file, so a config can be moved together with its
/// project tree.
pub fn expand_path(raw: &str, base_dir: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| Error::invalid_config(format!("Failed to expand path '{}': {}", raw, e)))?;

    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base_dir.join(path))
    }
}

/// Turn an arbitrary label into a lowercase, underscore-separated slug.
///
/// Returns an empty string when the input has no alphanumeric characters.
pub fn slugify(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                '_'
            }
        })
        .collect();

    cleaned
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
