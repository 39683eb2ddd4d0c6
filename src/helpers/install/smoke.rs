//! Post-install smoke test
//!
//! Runs the installed binary with fixed arguments (usually `--help`) and
//! requires exit status 0 within a timeout. A child that outlives the
//! timeout is killed.

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::cmd::tail_lines;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

const DIAGNOSTIC_LINES: usize = 20;

/// Execute `binary args...` and require a clean exit within `timeout`.
pub fn smoke_test(binary: &Path, args: &[String], timeout: Duration) -> Result<()> {
    if !binary.is_file() {
        return Err(InstallError::runtime(format!(
            "{} is not installed",
            binary.display()
        )));
    }

    output::detail(&format!("run: {} {}", binary.display(), args.join(" ")));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| InstallError::runtime(format!("cannot start runtime: {}", e)))?;

    runtime.block_on(run_with_timeout(binary, args, timeout))
}

async fn run_with_timeout(binary: &Path, args: &[String], timeout: Duration) -> Result<()> {
    let child = tokio::process::Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            InstallError::runtime(format!("cannot execute {}: {}", binary.display(), e))
        })?;

    // On timeout the future is dropped, which drops (and kills) the child
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            InstallError::runtime(format!(
                "{} did not terminate within {}s",
                binary.display(),
                timeout.as_secs()
            ))
        })?
        .map_err(|e| InstallError::runtime(format!("wait failed: {}", e)))?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(InstallError::Runtime {
            reason: format!(
                "{} {} exited with {}",
                binary.display(),
                args.join(" "),
                output.status
            ),
            diagnostics: tail_lines(&combined, DIAGNOSTIC_LINES),
        });
    }

    Ok(())
}
