//! Install sequence
//!
//! Runs one installation attempt strictly in order:
//!
//! 1. validate formula, take the formula lock
//! 2. resolve dependencies
//! 3. fetch + verify the source archive
//! 4. extract, configure, compile
//! 5. install artifacts into `<prefix>/bin`
//! 6. smoke test (optional)
//!
//! Any failure aborts the attempt; nothing after the failing step runs.

use super::config::Config;
use super::deps::{self, Resolution, Resolver};
use super::error::{InstallError, Result};
use super::formula::Formula;
use super::lock;
use super::output;
use crate::helpers::{acquire, build, install};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Skip the post-install smoke test
    pub skip_test: bool,
}

/// What an install produced
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub installed: Vec<PathBuf>,
    pub archive: PathBuf,
    pub smoke_tested: bool,
    pub resolution: Resolution,
}

/// Executes formulas against a configuration
#[derive(Debug, Clone)]
pub struct Installer {
    config: Config,
    resolver: Resolver,
}

impl Installer {
    pub fn new(config: Config) -> Self {
        let resolver = Resolver::default().with_override("cmake", config.cmake.clone());
        Self { config, resolver }
    }

    /// Replace the dependency resolver (keeps the cmake override in sync).
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver.with_override("cmake", self.config.cmake.clone());
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn lock_dir(&self) -> PathBuf {
        self.config.cache_dir.join("locks")
    }

    fn download_dir(&self) -> PathBuf {
        self.config.cache_dir.join("downloads")
    }

    /// Fetch and verify only; returns the cached archive path.
    pub fn fetch(&self, formula: &Formula) -> Result<PathBuf> {
        formula.validate()?;
        let checksum = formula.checksum()?;
        acquire::fetch_and_verify(
            &formula.source_url(),
            &checksum,
            &self.download_dir(),
            &formula.archive_name()?,
            self.config.http_timeout,
        )
    }

    /// Run the full install sequence.
    pub fn install(&self, formula: &Formula, options: InstallOptions) -> Result<InstallReport> {
        formula.validate()?;
        let _lock = lock::acquire_formula_lock(&self.lock_dir(), &formula.name)?;

        output::action(&format!("Installing {} {}", formula.name, formula.version));

        output::sub_action("dependencies");
        let resolution = deps::resolve_dependencies(formula, &self.resolver)?;

        output::sub_action("fetch");
        let archive = self.fetch(formula)?;

        let workspace = BuildWorkspace::create(&self.config, formula)?;
        let result = self.build_and_install(formula, &archive, workspace.path(), options);
        workspace.finish(self.config.keep_build || (result.is_err() && output::is_verbose()));

        let (installed, smoke_tested) = result?;
        output::success(&format!("{} {} installed", formula.name, formula.version));

        Ok(InstallReport {
            installed,
            archive,
            smoke_tested,
            resolution,
        })
    }

    fn build_and_install(
        &self,
        formula: &Formula,
        archive: &Path,
        work_dir: &Path,
        options: InstallOptions,
    ) -> Result<(Vec<PathBuf>, bool)> {
        let root = build::extract_source(archive, &work_dir.join("src"))?;
        let source_dir = root.join(&formula.build.source_dir);
        let build_dir = source_dir.join(&formula.build.build_dir);

        output::sub_action("configure");
        let build_tree = build::configure(
            &self.config.cmake,
            &source_dir,
            &build_dir,
            &self.config.prefix,
            &formula.build.args,
        )?;

        output::sub_action("compile");
        let artifacts = build::compile(&build_tree, &formula.build.artifacts)?;

        output::sub_action("install");
        let bin_dir = self.config.bin_dir();
        let installed = artifacts
            .iter()
            .map(|artifact| install::install(artifact, &bin_dir))
            .collect::<Result<Vec<_>>>()?;

        if options.skip_test || formula.test.is_none() {
            return Ok((installed, false));
        }

        output::sub_action("test");
        self.smoke_test(formula)?;
        Ok((installed, true))
    }

    /// Smoke-test the installed binary of a formula.
    pub fn smoke_test(&self, formula: &Formula) -> Result<()> {
        let test = formula.test.clone().unwrap_or_default();
        let binary = formula.test_binary().unwrap_or(&formula.name);
        let timeout = test
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.config.test_timeout);

        install::smoke_test(&self.config.bin_dir().join(binary), &test.args, timeout)
    }
}

/// Build directory for one run; temporary unless configured
struct BuildWorkspace {
    path: PathBuf,
    temp: Option<tempfile::TempDir>,
}

impl BuildWorkspace {
    fn create(config: &Config, formula: &Formula) -> Result<Self> {
        match &config.build_dir {
            Some(dir) => {
                let path = dir.join(format!("{}-{}", formula.name, formula.version));
                if path.exists() {
                    std::fs::remove_dir_all(&path)
                        .map_err(|e| InstallError::filesystem(&path, e))?;
                }
                std::fs::create_dir_all(&path).map_err(|e| InstallError::filesystem(&path, e))?;
                Ok(Self { path, temp: None })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("formula-{}-", formula.name))
                    .tempdir()
                    .map_err(|e| InstallError::filesystem(std::env::temp_dir(), e))?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                })
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace unless `keep` is set.
    fn finish(self, keep: bool) {
        if keep {
            let path = match self.temp {
                Some(temp) => temp.keep(),
                None => self.path,
            };
            output::detail(&format!("build directory kept at {}", path.display()));
        } else if self.temp.is_none() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
