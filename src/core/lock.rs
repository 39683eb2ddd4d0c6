//! Formula lock management
//!
//! Provides exclusive locking so two runner processes never install the
//! same formula at the same time.

use super::error::{InstallError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Acquire an exclusive lock for `name` inside `lock_dir`.
/// Returns a guard that releases the lock when dropped.
///
/// The OS releases the lock when its holder exits, so a lock file left by
/// a crashed run is simply locked again. The file itself is never deleted:
/// removing it while another process holds an open handle would let two
/// processes lock different files under the same name.
pub fn acquire_formula_lock(lock_dir: &Path, name: &str) -> Result<FormulaLock> {
    std::fs::create_dir_all(lock_dir).map_err(|e| InstallError::filesystem(lock_dir, e))?;
    let lock_path = lock_dir.join(format!("{}.lock", name));

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| InstallError::filesystem(&lock_path, e))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(InstallError::Locked {
            name: name.to_string(),
            lock: lock_path,
        });
    }

    Ok(FormulaLock { file: lock_file })
}

/// RAII guard for a formula lock - released when dropped
#[derive(Debug)]
pub struct FormulaLock {
    file: File,
}

impl Drop for FormulaLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
