//! Common filesystem utilities
//!
//! Provides shared filesystem operations used across multiple helpers.

use crate::core::error::{InstallError, Result};
use std::path::{Path, PathBuf};

/// Ensure a file's parent directory exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
    }
    Ok(())
}

/// Create a directory and all ancestors.
pub fn create_dir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| InstallError::filesystem(path, e))
}

/// Expand a glob pattern and return matching paths.
///
/// Returns an empty Vec if no matches found (doesn't error).
pub fn glob_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| {
            InstallError::InvalidFormula(format!("invalid glob pattern '{}': {}", pattern, e))
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(paths)
}

/// Set file permissions (Unix only).
///
/// No-op on non-Unix platforms.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| InstallError::filesystem(path, format!("chmod failed: {}", e)))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Check if path is safe (no path traversal).
///
/// Rejects absolute paths and paths containing "..".
pub fn is_safe_path(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
}

/// Validate that a path is within the given prefix directory.
///
/// Catches traversal through symlinks as well as `..` components.
pub fn validate_path_within_prefix(path: &Path, prefix: &Path) -> Result<()> {
    let canonical_prefix = prefix
        .canonicalize()
        .map_err(|e| InstallError::filesystem(prefix, e))?;

    // The target may not exist yet: canonicalize the parent and append the filename
    let canonical_path = if path.exists() {
        path.canonicalize()
            .map_err(|e| InstallError::filesystem(path, e))?
    } else {
        let parent = path
            .parent()
            .ok_or_else(|| InstallError::filesystem(path, "path has no parent"))?;
        let filename = path
            .file_name()
            .ok_or_else(|| InstallError::filesystem(path, "path has no filename"))?;
        parent
            .canonicalize()
            .map_err(|e| InstallError::filesystem(parent, e))?
            .join(filename)
    };

    if !canonical_path.starts_with(&canonical_prefix) {
        return Err(InstallError::filesystem(
            path,
            format!("path escapes prefix '{}'", prefix.display()),
        ));
    }

    Ok(())
}
