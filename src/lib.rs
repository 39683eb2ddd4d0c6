//! Declarative build-from-source formula runner
//!
//! A formula is a TOML file describing how to fetch, verify, build and
//! install one CMake-based package. The runner executes it as a strictly
//! sequential pipeline: fetch + verify, configure, compile, install, smoke
//! test. Any failing step aborts the attempt.
//!
//! # Example Formula
//!
//! ```toml
//! [package]
//! name = "yarrharr"
//! description = "Command-line interface tool for managing media downloads using TMDB metadata"
//! homepage = "https://github.com/asleepynerd/yarrharr"
//! version = "2.4.2"
//! url = "https://github.com/asleepynerd/yarrharr/archive/refs/tags/v{version}.tar.gz"
//! sha256 = "..."
//! license = "AGPL-3.0"
//!
//! [[dependency]]
//! name = "cmake"
//! kind = "build"
//!
//! [[dependency]]
//! name = "curl"
//! pkg_config = "libcurl"
//! command = "curl"
//!
//! [[dependency]]
//! name = "ffmpeg"
//! kind = "recommended"
//!
//! [build]
//! artifacts = ["build/yarrharr"]
//!
//! [test]
//! args = ["--help"]
//! ```
//!
//! # Steps
//!
//! - **fetch** - download the archive into the cache and verify its checksum
//!   (`sha256`, or `checksum = "sha512:..."` / `"blake3:..."`)
//! - **configure** - `cmake -S <src> -B <build>` with the standard arguments
//!   plus `build.args`
//! - **compile** - `cmake --build <build> -j <cpus>`
//! - **install** - copy `build.artifacts` into `<prefix>/bin`
//! - **smoke test** - run `<prefix>/bin/<binary> <test.args>` with a timeout
//!
//! # Errors
//!
//! Each step maps to one [`InstallError`] variant: NetworkError,
//! IntegrityError, ConfigurationError, BuildError, FilesystemError,
//! RuntimeError.

pub mod core;
pub mod helpers;

pub use crate::core::{
    output, Config, Dependency, DependencyKind, Formula, InstallError, InstallOptions,
    InstallReport, Installer, Resolution, Resolver,
};
