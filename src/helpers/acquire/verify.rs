//! Hash verification helpers
//!
//! ## Supported Hash Algorithms
//!
//! - SHA-256 (default; bare hex checksums are SHA-256)
//! - SHA-512
//! - BLAKE3

use crate::core::error::{InstallError, Result};
use crate::helpers::internal::hash::{self, Checksum};
use std::path::Path;

pub use crate::helpers::internal::hash::FileHashes;

/// Verify a file against an expected checksum.
///
/// A mismatch is an integrity error carrying both digests.
pub fn verify_file(path: &Path, expected: &Checksum) -> Result<()> {
    let actual =
        hash::hash_file(path, expected.algorithm).map_err(|e| InstallError::filesystem(path, e))?;

    if actual != expected.digest {
        return Err(InstallError::Integrity {
            path: path.to_path_buf(),
            algorithm: expected.algorithm.name(),
            expected: expected.digest.clone(),
            actual,
        });
    }

    Ok(())
}

/// Compute all hashes for a file (used by `formula hash`)
pub fn compute_hashes(file: &Path) -> Result<FileHashes> {
    hash::compute_all_hashes(file).map_err(|e| InstallError::filesystem(file, e))
}
