//! Runner configuration
//!
//! Precedence, lowest first: built-in defaults, `config.toml` in the user
//! config directory, environment variables, CLI flags (applied by the binary).

use super::error::{InstallError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default smoke test timeout in seconds
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PREFIX: &str = "/usr/local";

/// Effective settings for a formula run
#[derive(Debug, Clone)]
pub struct Config {
    /// Installation prefix; binaries land in `<prefix>/bin`
    pub prefix: PathBuf,
    /// Download cache for source archives
    pub cache_dir: PathBuf,
    /// Build directory (a fresh temp dir per run if not set)
    pub build_dir: Option<PathBuf>,
    /// CMake executable name or path
    pub cmake: PathBuf,
    pub http_timeout: Duration,
    pub test_timeout: Duration,
    /// Keep the build directory after a run
    pub keep_build: bool,
    /// Directories searched for `<name>.toml` formulas
    pub formula_paths: Vec<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    prefix: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    cmake: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    test_timeout_secs: Option<u64>,
    keep_build: Option<bool>,
    formula_paths: Option<Vec<PathBuf>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from(DEFAULT_PREFIX),
            cache_dir: default_cache_dir(),
            build_dir: None,
            cmake: PathBuf::from("cmake"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            test_timeout: Duration::from_secs(DEFAULT_TEST_TIMEOUT_SECS),
            keep_build: false,
            formula_paths: default_formula_paths(),
        }
    }
}

impl Config {
    /// Load defaults, the user config file (if any) and environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = user_config_path()
            && path.exists()
        {
            config.merge_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Merge settings from a TOML config file.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content =
            std::fs::read_to_string(path).map_err(|e| InstallError::filesystem(path, e))?;
        let parsed: ConfigToml = toml::from_str(&content).map_err(|e| {
            InstallError::configuration(format!("invalid config {}: {}", path.display(), e))
        })?;

        if let Some(v) = parsed.prefix {
            self.prefix = v;
        }
        if let Some(v) = parsed.cache_dir {
            self.cache_dir = v;
        }
        if parsed.build_dir.is_some() {
            self.build_dir = parsed.build_dir;
        }
        if let Some(v) = parsed.cmake {
            self.cmake = v;
        }
        if let Some(v) = parsed.http_timeout_secs {
            self.http_timeout = clamp_http_timeout(v);
        }
        if let Some(v) = parsed.test_timeout_secs {
            self.test_timeout = Duration::from_secs(v.max(1));
        }
        if let Some(v) = parsed.keep_build {
            self.keep_build = v;
        }
        if let Some(v) = parsed.formula_paths {
            self.formula_paths = v;
        }
        Ok(())
    }

    /// Apply `FORMULA_*` environment overrides through a lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FORMULA_PREFIX") {
            self.prefix = PathBuf::from(v);
        }
        if let Some(v) = lookup("FORMULA_CACHE") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FORMULA_CMAKE") {
            self.cmake = PathBuf::from(v);
        }
        if let Some(secs) = lookup("FORMULA_HTTP_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            self.http_timeout = clamp_http_timeout(secs);
        }
        if let Some(v) = lookup("FORMULA_PATH") {
            self.formula_paths = std::env::split_paths(&v).collect();
        }
    }

    /// Directory installed binaries land in
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Resolve a formula argument: an explicit `.toml` path or a name
    /// looked up as `<name>.toml` in the formula search path.
    pub fn resolve_formula(&self, formula: &str) -> Result<PathBuf> {
        let is_explicit_path =
            formula.contains('/') || formula.contains('\\') || formula.ends_with(".toml");

        if is_explicit_path {
            let path = PathBuf::from(formula);
            if path.is_file() {
                return Ok(path);
            }
            return Err(InstallError::InvalidFormula(format!(
                "formula file not found: {}",
                formula
            )));
        }

        super::formula::validate_name(formula)?;

        for dir in &self.formula_paths {
            let candidate = dir.join(format!("{}.toml", formula));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        let searched: Vec<_> = self
            .formula_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Err(InstallError::InvalidFormula(format!(
            "formula not found: {}\nSearched in: {}",
            formula,
            searched.join(", ")
        )))
    }
}

/// Clamp to a reasonable range (5-300 seconds)
fn clamp_http_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(5, 300))
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("formula")
}

fn default_formula_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(data) = dirs::data_dir() {
        paths.push(data.join("formula/formulas"));
    }
    paths.push(PathBuf::from("formulas"));
    paths
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("formula/config.toml"))
}
