//! Install built artifacts into `<prefix>/bin`
//!
//! Each artifact is copied to a temporary file next to its destination
//! and renamed over it, so re-running an install with the same artifact
//! leaves the same file in place and a running binary is never truncated.

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::fs_utils;
use std::path::{Path, PathBuf};

/// Mode for installed executables
const BIN_MODE: u32 = 0o755;

/// Install `artifact` into `destination` (a `bin` directory), returning
/// the installed path.
pub fn install(artifact: &Path, destination: &Path) -> Result<PathBuf> {
    let filename = artifact
        .file_name()
        .ok_or_else(|| InstallError::filesystem(artifact, "artifact has no filename"))?;

    if !artifact.is_file() {
        return Err(InstallError::filesystem(artifact, "artifact is not a file"));
    }

    fs_utils::create_dir_all(destination)?;
    let dest = destination.join(filename);
    fs_utils::validate_path_within_prefix(&dest, destination)?;

    let staging = destination.join(format!(".{}.tmp", filename.to_string_lossy()));
    let result = std::fs::copy(artifact, &staging)
        .map_err(|e| InstallError::filesystem(&staging, e))
        .and_then(|_| fs_utils::set_mode(&staging, BIN_MODE))
        .and_then(|_| {
            std::fs::rename(&staging, &dest).map_err(|e| InstallError::filesystem(&dest, e))
        });

    if let Err(e) = result {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }

    output::detail(&format!("install {} -> {}", artifact.display(), dest.display()));
    Ok(dest)
}
