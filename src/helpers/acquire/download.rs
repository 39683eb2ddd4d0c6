//! Download helpers for acquiring source archives
//!
//! Fetches `http(s)://` URLs with ureq (progress bar when the length is
//! known) and copies `file://` URLs from the local filesystem.

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::progress::{self, ProgressGuard, upgrade_to_bytes};
use crate::helpers::internal::url_utils::{self, UrlScheme};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("formula-runner/", env!("CARGO_PKG_VERSION"));

/// Download `url` to `dest`, returning the number of bytes written.
///
/// `timeout` applies to connecting and to any single stalled read; a slow
/// but steady transfer may take longer.
pub fn download(url: &str, dest: &Path, timeout: Duration) -> Result<u64> {
    let scheme = url_utils::validate_url_scheme(
        url,
        &[UrlScheme::Https, UrlScheme::Http, UrlScheme::File],
    )
    .map_err(|e| InstallError::network(url, e))?;

    fs_utils::ensure_parent_dir(dest)?;

    let filename = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    let total_bytes = match scheme {
        UrlScheme::File => copy_local(url, dest)?,
        UrlScheme::Http | UrlScheme::Https => {
            download_with_progress(url, dest, &filename, timeout)?
        }
    };

    output::detail(&format!("downloaded {} ({} bytes)", filename, total_bytes));
    Ok(total_bytes)
}

fn copy_local(url: &str, dest: &Path) -> Result<u64> {
    let src = url_utils::file_url_path(url).unwrap_or(url);
    std::fs::copy(src, dest).map_err(|e| InstallError::network(url, e))
}

/// Download a file with progress bar
fn download_with_progress(
    url: &str,
    dest: &Path,
    filename: &str,
    timeout: Duration,
) -> Result<u64> {
    let pb = progress::create_spinner(&format!("downloading {}", filename));
    let _guard = ProgressGuard::new(&pb);

    // `timeout` bounds connecting and each read, not the whole transfer
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .user_agent(USER_AGENT)
        .build();

    let response = agent
        .get(url)
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                InstallError::network(url, format!("server returned HTTP {}", code))
            }
            ureq::Error::Transport(t) => InstallError::network(url, t),
        })?;

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        upgrade_to_bytes(&pb, len);
    }

    let mut file = std::fs::File::create(dest).map_err(|e| InstallError::filesystem(dest, e))?;
    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| InstallError::network(url, format!("read error: {}", e)))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| InstallError::filesystem(dest, e))?;

        total_bytes += bytes_read as u64;
        pb.set_position(total_bytes);
    }

    file.flush().map_err(|e| InstallError::filesystem(dest, e))?;
    Ok(total_bytes)
}
