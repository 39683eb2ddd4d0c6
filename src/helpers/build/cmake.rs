//! CMake configure and compile phases
//!
//! `configure` runs `cmake -S <src> -B <build>` with the standard install
//! flags; `compile` runs `cmake --build <build>` and checks that every
//! declared artifact was produced.

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::cmd::{ToolCmd, ToolError};
use crate::helpers::internal::fs_utils;
use std::path::{Path, PathBuf};

/// A configured CMake build tree
#[derive(Debug, Clone)]
pub struct BuildDirectory {
    /// Directory `cmake -S` pointed at
    pub source_dir: PathBuf,
    /// Directory `cmake -B` created
    pub build_dir: PathBuf,
    cmake: PathBuf,
}

impl BuildDirectory {
    pub fn cmake(&self) -> &Path {
        &self.cmake
    }
}

/// Standard platform-appropriate configure flags for a prefix.
pub fn std_cmake_args(prefix: &Path) -> Vec<String> {
    let mut args = vec![
        format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()),
        "-DCMAKE_INSTALL_LIBDIR=lib".to_string(),
        "-DCMAKE_BUILD_TYPE=Release".to_string(),
        "-DCMAKE_FIND_FRAMEWORK=LAST".to_string(),
        "-DCMAKE_VERBOSE_MAKEFILE=ON".to_string(),
        "-DBUILD_TESTING=OFF".to_string(),
        "-Wno-dev".to_string(),
    ];
    if cfg!(target_os = "macos") {
        args.push("-DCMAKE_OSX_SYSROOT=".to_string() + &macos_sysroot());
    }
    args
}

#[cfg(target_os = "macos")]
fn macos_sysroot() -> String {
    std::process::Command::new("xcrun")
        .args(["--show-sdk-path"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default()
}

#[cfg(not(target_os = "macos"))]
fn macos_sysroot() -> String {
    String::new()
}

/// Configure a build tree.
///
/// `build_flags` are appended after [`std_cmake_args`]. A missing `cmake`
/// executable or a failing configure step is a configuration error.
pub fn configure(
    cmake: &Path,
    source_dir: &Path,
    build_dir: &Path,
    prefix: &Path,
    build_flags: &[String],
) -> Result<BuildDirectory> {
    if !source_dir.join("CMakeLists.txt").is_file() {
        return Err(InstallError::configuration(format!(
            "no CMakeLists.txt in {}",
            source_dir.display()
        )));
    }
    fs_utils::create_dir_all(build_dir)?;

    let cmd = ToolCmd::new(cmake)
        .arg("-S")
        .arg(source_dir)
        .arg("-B")
        .arg(build_dir)
        .args(std_cmake_args(prefix))
        .args(build_flags)
        .dir(source_dir);

    cmd.run().map_err(|e| match e {
        e if e.is_not_found() => InstallError::configuration(format!(
            "build-time dependency '{}' not found",
            cmake.display()
        )),
        ToolError::Spawn(err) => {
            InstallError::configuration(format!("cannot run {}: {}", cmake.display(), err))
        }
        ToolError::Failed { code, diagnostics } => InstallError::Configuration {
            reason: format!("cmake configure exited with code {:?}", code),
            diagnostics,
        },
    })?;

    output::detail(&format!("configured {}", build_dir.display()));
    Ok(BuildDirectory {
        source_dir: source_dir.to_path_buf(),
        build_dir: build_dir.to_path_buf(),
        cmake: cmake.to_path_buf(),
    })
}

/// Compile a configured build tree and locate the declared artifacts.
///
/// Artifact patterns are relative to the source directory and may be globs.
pub fn compile(build: &BuildDirectory, artifacts: &[String]) -> Result<Vec<PathBuf>> {
    let jobs = num_cpus::get().to_string();
    let cmd = ToolCmd::new(build.cmake())
        .arg("--build")
        .arg(&build.build_dir)
        .args(["-j", jobs.as_str()])
        .dir(&build.source_dir);

    cmd.run().map_err(|e| match e {
        ToolError::Spawn(err) => {
            InstallError::build(format!("cannot run {}: {}", build.cmake().display(), err))
        }
        ToolError::Failed { code, diagnostics } => InstallError::Build {
            reason: format!("cmake --build exited with code {:?}", code),
            diagnostics,
        },
    })?;

    let mut found = Vec::new();
    for pattern in artifacts {
        // Only the formula's pattern is a glob; the directory is literal
        let base = glob::Pattern::escape(&build.source_dir.to_string_lossy());
        let full = Path::new(&base).join(pattern);
        let matches = fs_utils::glob_paths(&full.to_string_lossy())?;
        let files: Vec<_> = matches.into_iter().filter(|p| p.is_file()).collect();
        if files.is_empty() {
            return Err(InstallError::build(format!(
                "expected artifact not produced: {}",
                pattern
            )));
        }
        found.extend(files);
    }

    output::detail(&format!("built {} artifact(s)", found.len()));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_cmake_args() {
        let args = std_cmake_args(Path::new("/opt/pkg"));
        assert_eq!(args[0], "-DCMAKE_INSTALL_PREFIX=/opt/pkg");
        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(args.contains(&"-Wno-dev".to_string()));
    }

    #[test]
    fn test_configure_missing_cmake() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CMakeLists.txt"), "project(x)").unwrap();

        let err = configure(
            Path::new("/nonexistent/bin/cmake"),
            dir.path(),
            &dir.path().join("build"),
            Path::new("/tmp/prefix"),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_configure_requires_cmakelists() {
        let dir = tempfile::tempdir().unwrap();
        let err = configure(
            Path::new("cmake"),
            dir.path(),
            &dir.path().join("build"),
            Path::new("/tmp/prefix"),
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("CMakeLists.txt"));
    }

    #[cfg(unix)]
    mod fake_cmake {
        use super::*;
        use crate::helpers::internal::fs_utils::set_mode;

        /// Stand-in for cmake: `-S` creates the build dir, `--build`
        /// writes `build/tool` unless FAIL_BUILD is in the source dir.
        fn write_fake_cmake(dir: &Path) -> PathBuf {
            let path = dir.join("cmake");
            std::fs::write(
                &path,
                r#"#!/bin/sh
if [ "$1" = "--build" ]; then
  if [ -f FAIL_BUILD ]; then echo "main.cpp:3: error: expected ';'" >&2; exit 2; fi
  printf '#!/bin/sh\nexit 0\n' > "$2/tool"
  chmod +x "$2/tool"
  exit 0
fi
if [ -f FAIL_CONFIGURE ]; then echo "Could NOT find CURL" >&2; exit 1; fi
mkdir -p "$4"
exit 0
"#,
            )
            .unwrap();
            set_mode(&path, 0o755).unwrap();
            path
        }

        #[test]
        fn test_configure_and_compile() {
            let dir = tempfile::tempdir().unwrap();
            let cmake = write_fake_cmake(dir.path());
            let src = dir.path().join("src");
            std::fs::create_dir_all(&src).unwrap();
            std::fs::write(src.join("CMakeLists.txt"), "project(tool)").unwrap();

            let build =
                configure(&cmake, &src, &src.join("build"), Path::new("/opt"), &[]).unwrap();
            let artifacts = compile(&build, &["build/tool".to_string()]).unwrap();
            assert_eq!(artifacts, vec![src.join("build/tool")]);
        }

        #[test]
        fn test_configure_failure_carries_diagnostics() {
            let dir = tempfile::tempdir().unwrap();
            let cmake = write_fake_cmake(dir.path());
            std::fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();
            std::fs::write(dir.path().join("FAIL_CONFIGURE"), "").unwrap();

            let err = configure(&cmake, dir.path(), &dir.path().join("build"), Path::new("/opt"), &[])
                .unwrap_err();
            assert_eq!(err.kind(), "ConfigurationError");
            assert!(err.to_string().contains("Could NOT find CURL"));
        }

        #[test]
        fn test_compile_failure_is_build_error() {
            let dir = tempfile::tempdir().unwrap();
            let cmake = write_fake_cmake(dir.path());
            std::fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();
            std::fs::write(dir.path().join("FAIL_BUILD"), "").unwrap();

            let build =
                configure(&cmake, dir.path(), &dir.path().join("build"), Path::new("/opt"), &[])
                    .unwrap();
            let err = compile(&build, &["build/tool".to_string()]).unwrap_err();
            assert_eq!(err.kind(), "BuildError");
            assert!(err.to_string().contains("expected ';'"));
        }

        #[test]
        fn test_compile_finds_artifact_under_glob_metacharacters() {
            let dir = tempfile::tempdir().unwrap();
            let cmake = write_fake_cmake(dir.path());
            let src = dir.path().join("pkg[1]*?");
            std::fs::create_dir_all(&src).unwrap();
            std::fs::write(src.join("CMakeLists.txt"), "project(tool)").unwrap();

            let build =
                configure(&cmake, &src, &src.join("build"), Path::new("/opt"), &[]).unwrap();
            let artifacts = compile(&build, &["build/to*".to_string()]).unwrap();
            assert_eq!(artifacts, vec![src.join("build/tool")]);
        }

        #[test]
        fn test_compile_missing_artifact() {
            let dir = tempfile::tempdir().unwrap();
            let cmake = write_fake_cmake(dir.path());
            std::fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();

            let build =
                configure(&cmake, dir.path(), &dir.path().join("build"), Path::new("/opt"), &[])
                    .unwrap();
            let err = compile(&build, &["build/other".to_string()]).unwrap_err();
            assert!(err.to_string().contains("expected artifact not produced"));
        }
    }
}
