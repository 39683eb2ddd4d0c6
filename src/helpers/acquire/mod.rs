//! Acquire phase: fetch a source archive and verify its integrity
//!
//! Archives are cached by name. A cached archive that still matches its
//! checksum is reused; one that doesn't is discarded and fetched again.
//! Fresh downloads land in a `.part` file that is only renamed into the
//! cache once verified.

pub mod download;
pub mod verify;

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::hash::Checksum;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use verify::{FileHashes, compute_hashes, verify_file};

/// Fetch `source_url` into `cache_dir/archive_name` and verify `checksum`.
///
/// Fails with a network error if retrieval fails and with an integrity
/// error if the hash doesn't match; a mismatching download is deleted.
pub fn fetch_and_verify(
    source_url: &str,
    checksum: &Checksum,
    cache_dir: &Path,
    archive_name: &str,
    timeout: Duration,
) -> Result<PathBuf> {
    let archive = cache_dir.join(archive_name);

    if archive.is_file() {
        match verify_file(&archive, checksum) {
            Ok(()) => {
                output::skip(&format!("{} already downloaded", archive_name));
                return Ok(archive);
            }
            Err(InstallError::Integrity { .. }) => {
                output::warning(&format!(
                    "cached {} does not match its checksum, fetching again",
                    archive_name
                ));
                std::fs::remove_file(&archive)
                    .map_err(|e| InstallError::filesystem(&archive, e))?;
            }
            Err(e) => return Err(e),
        }
    }

    let partial = cache_dir.join(format!("{}.part", archive_name));
    output::detail(&format!("downloading {}", source_url));
    if let Err(e) = download::download(source_url, &partial, timeout) {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    output::detail(&format!("verifying {}", checksum.algorithm.name().to_lowercase()));
    if let Err(e) = verify_file(&partial, checksum) {
        let _ = std::fs::remove_file(&partial);
        // Report the cache path, not the temporary one
        return Err(match e {
            InstallError::Integrity {
                algorithm,
                expected,
                actual,
                ..
            } => InstallError::Integrity {
                path: archive,
                algorithm,
                expected,
                actual,
            },
            other => other,
        });
    }

    std::fs::rename(&partial, &archive).map_err(|e| InstallError::filesystem(&archive, e))?;
    Ok(archive)
}
