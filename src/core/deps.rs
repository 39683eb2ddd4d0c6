//! Dependency resolution
//!
//! Every declared dependency is checked before anything is fetched: an
//! executable on PATH, or a pkg-config module for libraries. Missing build
//! or required dependencies abort the install; missing recommended ones
//! only produce a warning.

use super::error::{InstallError, Result};
use super::formula::{Dependency, DependencyKind, Formula};
use super::output;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// How a dependency was (or wasn't) found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Executable found at this path
    Command(PathBuf),
    /// pkg-config module present
    PkgConfig(String),
    Missing,
}

impl Detection {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// Resolution status of one dependency
#[derive(Debug, Clone)]
pub struct ResolvedDep {
    pub dependency: Dependency,
    pub detection: Detection,
}

/// Result of resolving a formula's dependencies
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub deps: Vec<ResolvedDep>,
}

impl Resolution {
    /// Mandatory dependencies that were not found
    pub fn missing_mandatory(&self) -> Vec<&Dependency> {
        self.deps
            .iter()
            .filter(|d| d.dependency.kind.is_mandatory() && !d.detection.is_found())
            .map(|d| &d.dependency)
            .collect()
    }

    /// Recommended dependencies that were not found
    pub fn missing_recommended(&self) -> Vec<&Dependency> {
        self.deps
            .iter()
            .filter(|d| d.dependency.kind == DependencyKind::Recommended && !d.detection.is_found())
            .map(|d| &d.dependency)
            .collect()
    }

    /// Fail with a configuration error listing every missing mandatory dependency.
    pub fn ensure_satisfied(&self) -> Result<()> {
        let missing = self.missing_mandatory();
        if missing.is_empty() {
            return Ok(());
        }
        let list: Vec<String> = missing
            .iter()
            .map(|d| format!("{} ({})", d.name, d.kind))
            .collect();
        Err(InstallError::configuration(format!(
            "unresolved dependencies: {}",
            list.join(", ")
        )))
    }
}

/// Detects dependencies in the host environment
#[derive(Debug, Clone)]
pub struct Resolver {
    search_path: Vec<PathBuf>,
    overrides: HashMap<String, PathBuf>,
    pkg_config: PathBuf,
}

impl Default for Resolver {
    fn default() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::with_search_path(search_path)
    }
}

impl Resolver {
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            overrides: HashMap::new(),
            pkg_config: PathBuf::from("pkg-config"),
        }
    }

    /// Resolve the named command to an explicit program instead of PATH.
    ///
    /// Used for the configured cmake so the build dependency and the
    /// configure step agree on which executable runs.
    pub fn with_override(mut self, command: &str, program: impl Into<PathBuf>) -> Self {
        self.overrides.insert(command.to_string(), program.into());
        self
    }

    pub fn with_pkg_config(mut self, program: impl Into<PathBuf>) -> Self {
        self.pkg_config = program.into();
        self
    }

    /// Locate an executable by name (or check an explicit path).
    pub fn find_command(&self, command: &str) -> Option<PathBuf> {
        if let Some(program) = self.overrides.get(command) {
            return self.find_program(program);
        }
        self.find_program(Path::new(command))
    }

    fn find_program(&self, program: &Path) -> Option<PathBuf> {
        if program.components().count() > 1 {
            return is_executable(program).then(|| program.to_path_buf());
        }
        self.search_path
            .iter()
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn pkg_config_exists(&self, module: &str) -> bool {
        Command::new(&self.pkg_config)
            .args(["--exists", module])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Detect a single dependency.
    pub fn detect(&self, dep: &Dependency) -> Detection {
        if let Some(ref module) = dep.pkg_config {
            if self.pkg_config_exists(module) {
                return Detection::PkgConfig(module.clone());
            }
            // Fall through to an explicit command if there is one
            return match dep.command.as_deref().and_then(|c| self.find_command(c)) {
                Some(path) => Detection::Command(path),
                None => Detection::Missing,
            };
        }

        let command = dep.command.as_deref().unwrap_or(&dep.name);
        match self.find_command(command) {
            Some(path) => Detection::Command(path),
            None => Detection::Missing,
        }
    }

    /// Detect every dependency a formula declares.
    pub fn resolve(&self, formula: &Formula) -> Resolution {
        let deps = formula
            .dependencies
            .iter()
            .map(|dep| ResolvedDep {
                dependency: dep.clone(),
                detection: self.detect(dep),
            })
            .collect();
        Resolution { deps }
    }
}

/// Resolve dependencies and fail if a mandatory one is missing.
///
/// Missing recommended dependencies are reported as warnings.
pub fn resolve_dependencies(formula: &Formula, resolver: &Resolver) -> Result<Resolution> {
    let resolution = resolver.resolve(formula);

    for dep in &resolution.deps {
        match &dep.detection {
            Detection::Command(path) => output::verbose(&format!(
                "{} ({}) -> {}",
                dep.dependency.name,
                dep.dependency.kind,
                path.display()
            )),
            Detection::PkgConfig(module) => output::verbose(&format!(
                "{} ({}) -> pkg-config {}",
                dep.dependency.name, dep.dependency.kind, module
            )),
            Detection::Missing => {}
        }
    }

    for dep in resolution.missing_recommended() {
        output::warning(&format!(
            "recommended dependency '{}' not found; related features will be unavailable",
            dep.name
        ));
    }

    resolution.ensure_satisfied()?;
    Ok(resolution)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
