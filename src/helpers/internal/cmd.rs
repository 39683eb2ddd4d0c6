//! External tool execution
//!
//! Provides a builder for running build tools with consistent output
//! handling: a spinner and captured output normally, streamed output in
//! verbose mode. Failures keep the tail of the tool's output so it can be
//! shown to the user.

use super::progress::{self, ProgressGuard};
use crate::core::output;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Number of trailing output lines kept for diagnostics
const DIAGNOSTIC_LINES: usize = 40;

/// Why a tool invocation failed.
#[derive(Debug)]
pub enum ToolError {
    /// The program could not be started at all
    Spawn(std::io::Error),
    /// The program ran and exited unsuccessfully
    Failed {
        code: Option<i32>,
        diagnostics: String,
    },
}

impl ToolError {
    /// True if the program was not found on PATH (or at the given path)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Builder for a tool invocation.
///
/// # Example
/// ```ignore
/// ToolCmd::new("cmake")
///     .args(["--build", "build"])
///     .dir(&src_dir)
///     .run()?;
/// ```
#[derive(Debug, Clone)]
pub struct ToolCmd {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the working directory for the command.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line, truncated for display
    pub fn display(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        if s.chars().count() > 60 {
            let truncated: String = s.chars().take(57).collect();
            format!("{}...", truncated)
        } else {
            s
        }
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run the command to completion.
    pub fn run(&self) -> Result<(), ToolError> {
        let display = self.display();

        if output::is_verbose() {
            output::detail(&format!("run: {}", display));
            let status = self
                .build_command()
                .status()
                .map_err(ToolError::Spawn)?;
            return if status.success() {
                Ok(())
            } else {
                Err(ToolError::Failed {
                    code: status.code(),
                    diagnostics: String::new(),
                })
            };
        }

        let pb = progress::create_spinner(&format!("run: {}", display));
        let _guard = ProgressGuard::new(&pb);

        let out = self
            .build_command()
            .stdin(Stdio::null())
            .output()
            .map_err(ToolError::Spawn)?;

        if !out.status.success() {
            let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&out.stderr));
            return Err(ToolError::Failed {
                code: out.status.code(),
                diagnostics: tail_lines(&combined, DIAGNOSTIC_LINES),
            });
        }

        Ok(())
    }
}

/// Keep the last `n` lines of `text`.
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
