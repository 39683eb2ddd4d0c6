//! Package formula: the declarative install recipe
//!
//! A formula is a TOML file describing where to fetch a source archive,
//! how to verify it, what it depends on, how to build and install it and
//! how to smoke-test the result:
//!
//! ```toml
//! [package]
//! name = "yarrharr"
//! version = "2.4.2"
//! url = "https://github.com/asleepynerd/yarrharr/archive/refs/tags/v{version}.tar.gz"
//! sha256 = "..."
//! license = "AGPL-3.0"
//!
//! [[dependency]]
//! name = "cmake"
//! kind = "build"
//!
//! [build]
//! artifacts = ["build/yarrharr"]
//!
//! [test]
//! args = ["--help"]
//! ```

use super::error::{InstallError, Result};
use crate::helpers::build::ArchiveFormat;
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::hash::Checksum;
use crate::helpers::internal::url_utils::{self, UrlScheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder for the version in URL templates
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed to build; missing means configure cannot run
    Build,
    /// Needed at run time
    #[default]
    Required,
    /// Optional run-time feature (e.g. ffmpeg for MP4 conversion)
    Recommended,
}

impl DependencyKind {
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, Self::Recommended)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Build => "build",
            Self::Required => "required",
            Self::Recommended => "recommended",
        };
        f.write_str(s)
    }
}

/// A declared dependency and how to detect it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Executable to look for on PATH (defaults to `name` without `pkg_config`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// pkg-config module to check for libraries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkg_config: Option<String>,
}

/// Configure/compile/install instructions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    /// Source directory relative to the extracted archive root
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Build directory relative to the source directory
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Extra configure flags appended after the standard ones
    #[serde(default)]
    pub args: Vec<String>,
    /// Files (globs allowed) relative to the source directory installed into `bin`
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            build_dir: default_build_dir(),
            args: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

/// Post-install smoke test
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    /// Installed binary name (defaults to the package name)
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default = "default_test_args")]
    pub args: Vec<String>,
    /// Overrides the configured smoke test timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for TestSpec {
    fn default() -> Self {
        Self {
            binary: None,
            args: default_test_args(),
            timeout_secs: None,
        }
    }
}

fn default_test_args() -> Vec<String> {
    vec!["--help".to_string()]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageToml {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    homepage: String,
    version: String,
    url: String,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    license: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormulaToml {
    package: PackageToml,
    #[serde(default, rename = "dependency")]
    dependencies: Vec<Dependency>,
    #[serde(default)]
    build: BuildSpec,
    #[serde(default)]
    test: Option<TestSpec>,
}

/// A parsed package formula.
///
/// Parsing only checks structure; [`Formula::validate`] enforces the
/// invariants an install relies on.
#[derive(Debug, Clone, Serialize)]
pub struct Formula {
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub version: String,
    /// Source URL template, may contain `{version}`
    pub url: String,
    /// Checksum exactly as written in the formula
    pub checksum: String,
    pub license: String,
    pub dependencies: Vec<Dependency>,
    pub build: BuildSpec,
    pub test: Option<TestSpec>,
}

impl Formula {
    /// Load a formula from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| InstallError::filesystem(path, e))?;
        Self::parse(&content).map_err(|e| match e {
            InstallError::InvalidFormula(msg) => {
                InstallError::InvalidFormula(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse formula TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: FormulaToml =
            toml::from_str(content).map_err(|e| InstallError::InvalidFormula(e.to_string()))?;
        let pkg = raw.package;

        let checksum = match (pkg.sha256, pkg.checksum) {
            (Some(sha), None) => sha,
            (None, Some(c)) => c,
            (Some(_), Some(_)) => {
                return Err(InstallError::InvalidFormula(
                    "set either 'sha256' or 'checksum', not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(InstallError::InvalidFormula(
                    "missing 'sha256' (or 'checksum')".to_string(),
                ));
            }
        };

        let mut build = raw.build;
        if build.artifacts.is_empty() {
            build
                .artifacts
                .push(format!("{}/{}", build.build_dir.display(), pkg.name));
        }

        Ok(Self {
            name: pkg.name,
            description: pkg.description,
            homepage: pkg.homepage,
            version: pkg.version,
            url: pkg.url,
            checksum,
            license: pkg.license,
            dependencies: raw.dependencies,
            build,
            test: raw.test,
        })
    }

    /// Source URL with the version substituted
    pub fn source_url(&self) -> String {
        self.url.replace(VERSION_PLACEHOLDER, &self.version)
    }

    /// Parsed checksum
    pub fn checksum(&self) -> Result<Checksum> {
        Checksum::parse(&self.checksum).map_err(InstallError::InvalidFormula)
    }

    /// Cache filename for the source archive: `<name>-<version>.<ext>`
    pub fn archive_name(&self) -> Result<String> {
        let url_name = url_utils::extract_filename(&self.source_url());
        let format = ArchiveFormat::from_filename(&url_name).ok_or_else(|| {
            InstallError::InvalidFormula(format!(
                "cannot detect archive format from URL: {}",
                self.source_url()
            ))
        })?;
        Ok(format!("{}-{}.{}", self.name, self.version, format.extension()))
    }

    /// Binary the smoke test runs, if the formula declares a test
    pub fn test_binary(&self) -> Option<&str> {
        self.test
            .as_ref()
            .map(|t| t.binary.as_deref().unwrap_or(&self.name))
    }

    /// Check every invariant, returning all problems found.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = validate_name(&self.name) {
            problems.push(e.to_string());
        }

        if let Err(e) = semver::Version::parse(&self.version) {
            problems.push(format!(
                "version '{}' is not a semantic version: {}",
                self.version, e
            ));
        }

        if !self.url.contains(VERSION_PLACEHOLDER) && !self.url.contains(&self.version) {
            problems.push(format!(
                "url does not reference version {} (use {} in the template)",
                self.version, VERSION_PLACEHOLDER
            ));
        }

        let url = self.source_url();
        if let Err(e) =
            url_utils::validate_url_scheme(&url, &[UrlScheme::Https, UrlScheme::Http, UrlScheme::File])
        {
            problems.push(e);
        }
        if let Err(e) = self.archive_name() {
            problems.push(e.to_string());
        }

        if let Err(e) = self.checksum() {
            problems.push(e.to_string());
        }

        for dep in &self.dependencies {
            if dep.name.trim().is_empty() {
                problems.push("dependency with empty name".to_string());
            }
        }

        for path in [&self.build.source_dir, &self.build.build_dir] {
            if !fs_utils::is_safe_path(path) {
                problems.push(format!("unsafe build path: {}", path.display()));
            }
        }
        for artifact in &self.build.artifacts {
            if !fs_utils::is_safe_path(Path::new(artifact)) {
                problems.push(format!("unsafe artifact path: {}", artifact));
            }
        }

        if let Some(binary) = self.test_binary()
            && validate_name(binary).is_err()
        {
            problems.push(format!("invalid test binary name: {}", binary));
        }

        if let Some(test) = &self.test
            && test.timeout_secs == Some(0)
        {
            problems.push("test timeout_secs must be at least 1".to_string());
        }

        problems
    }

    /// Fail with the first invalid-formula problem, if any.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(InstallError::InvalidFormula(problems.join("; ")))
        }
    }
}

/// Validate a package name to prevent path traversal
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(InstallError::InvalidFormula(
            "name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '+')
        || name.starts_with('-')
    {
        return Err(InstallError::InvalidFormula(format!(
            "invalid name '{}': only alphanumeric characters, '_', '-' and '+' are allowed",
            name
        )));
    }

    Ok(())
}
