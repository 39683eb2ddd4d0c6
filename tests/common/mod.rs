//! Shared fixtures for pipeline tests.
//!
//! Builds source tarballs on the fly and provides a shell-script stand-in
//! for cmake so the whole install sequence runs without a toolchain.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use formula_runner::Config;
use formula_runner::helpers::acquire::compute_hashes;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated prefix, cache and tool directories for one test
pub struct TestEnv {
    pub dir: TempDir,
    pub prefix: PathBuf,
    pub cache: PathBuf,
    pub tools: PathBuf,
    pub formulas: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("prefix");
        let cache = dir.path().join("cache");
        let tools = dir.path().join("tools");
        let formulas = dir.path().join("formulas");
        for d in [&prefix, &cache, &tools, &formulas] {
            std::fs::create_dir_all(d).unwrap();
        }
        Self {
            dir,
            prefix,
            cache,
            tools,
            formulas,
        }
    }

    /// Config pointing at this environment and the given cmake
    pub fn config(&self, cmake: &Path) -> Config {
        Config {
            prefix: self.prefix.clone(),
            cache_dir: self.cache.clone(),
            build_dir: None,
            cmake: cmake.to_path_buf(),
            formula_paths: vec![self.formulas.clone()],
            ..Config::default()
        }
    }

    pub fn bin(&self, name: &str) -> PathBuf {
        self.prefix.join("bin").join(name)
    }

    /// Every invocation of the fake cmake, one line per call
    pub fn cmake_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.tools.join("cmake.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Write a formula file into the formula directory
    pub fn write_formula(&self, name: &str, content: &str) -> PathBuf {
        let path = self.formulas.join(format!("{}.toml", name));
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Create `<name>-<version>.tar.gz` containing `<name>-<version>/CMakeLists.txt`
/// plus any extra `(path, content)` files, and return its path.
pub fn source_tarball(dir: &Path, name: &str, version: &str, extra: &[(&str, &str)]) -> PathBuf {
    let archive = dir.join(format!("{}-{}.tar.gz", name, version));
    let file = std::fs::File::create(&archive).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let root = format!("{}-{}", name, version);
    let cmakelists = format!("cmake_minimum_required(VERSION 3.14)\nproject({})\n", name);
    let mut files = vec![("CMakeLists.txt", cmakelists.as_str())];
    files.extend_from_slice(extra);

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", root, path), content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    archive
}

pub fn sha256_of(path: &Path) -> String {
    compute_hashes(path).unwrap().sha256
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Write an executable shell script
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.sync_all().unwrap();
    drop(file);
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Stand-in for cmake that records its arguments in `cmake.log`.
///
/// Configure creates the build directory (fails if `FAIL_CONFIGURE` is in
/// the source tree). `--build` writes `build/<binary>`: a script that prints
/// usage for `--help` and exits 0, or exits 3 if `BROKEN_BINARY` is in the
/// source tree.
#[cfg(unix)]
pub fn fake_cmake(env: &TestEnv, binary: &str) -> PathBuf {
    let path = env.tools.join("cmake");
    let log = env.tools.join("cmake.log");
    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "{log}"
if [ "$1" = "--build" ]; then
  if [ -f FAIL_BUILD ]; then echo "error: undefined reference to curl_easy_init" >&2; exit 2; fi
  if [ -f BROKEN_BINARY ]; then
    printf '#!/bin/sh\necho "segfault" >&2\nexit 3\n' > "$2/{binary}"
  else
    printf '#!/bin/sh\nif [ "$1" = "--help" ]; then echo "usage: {binary} [options]"; exit 0; fi\nexit 1\n' > "$2/{binary}"
  fi
  chmod +x "$2/{binary}"
  exit 0
fi
if [ -f FAIL_CONFIGURE ]; then echo "CMake Error: Could NOT find CURL" >&2; exit 1; fi
mkdir -p "$4"
exit 0
"#,
        log = log.display(),
        binary = binary,
    );
    write_script(&path, &script);
    path
}

/// Minimal formula for a package built from `url`
pub fn formula_toml(name: &str, version: &str, url: &str, sha256: &str) -> String {
    format!(
        r#"[package]
name = "{name}"
description = "test package"
version = "{version}"
url = "{url}"
sha256 = "{sha256}"
license = "MIT"

[[dependency]]
name = "cmake"
kind = "build"

[build]
artifacts = ["build/{name}"]

[test]
args = ["--help"]
timeout_secs = 10
"#
    )
}
