//! Install error taxonomy.
//!
//! Every failure aborts the install attempt. Variants carry the diagnostic
//! output of the underlying tool where there is one.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a formula.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error(
        "{algorithm} integrity check failed for '{}'\n  expected: {expected}\n  got:      {actual}",
        .path.display()
    )]
    Integrity {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("configuration failed: {reason}{}", diagnostics_suffix(.diagnostics))]
    Configuration { reason: String, diagnostics: String },

    #[error("build failed: {reason}{}", diagnostics_suffix(.diagnostics))]
    Build { reason: String, diagnostics: String },

    #[error("filesystem error at '{}': {reason}", .path.display())]
    Filesystem { path: PathBuf, reason: String },

    #[error("smoke test failed: {reason}{}", diagnostics_suffix(.diagnostics))]
    Runtime { reason: String, diagnostics: String },

    #[error("invalid formula: {0}")]
    InvalidFormula(String),

    #[error(
        "formula '{name}' is already being installed by another process (lock: '{}')",
        .lock.display()
    )]
    Locked { name: String, lock: PathBuf },
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    if diagnostics.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", diagnostics.trim_end())
    }
}

impl InstallError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
            diagnostics: String::new(),
        }
    }

    pub fn build(reason: impl Into<String>) -> Self {
        Self::Build {
            reason: reason.into(),
            diagnostics: String::new(),
        }
    }

    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::Runtime {
            reason: reason.into(),
            diagnostics: String::new(),
        }
    }

    /// Short name of the error class, used in the CLI summary line.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NetworkError",
            Self::Integrity { .. } => "IntegrityError",
            Self::Configuration { .. } => "ConfigurationError",
            Self::Build { .. } => "BuildError",
            Self::Filesystem { .. } => "FilesystemError",
            Self::Runtime { .. } => "RuntimeError",
            Self::InvalidFormula(_) => "InvalidFormula",
            Self::Locked { .. } => "Locked",
        }
    }
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
