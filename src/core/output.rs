//! Colored output for the formula runner
//!
//! Uses owo-colors for terminal colors. Progress bars live in
//! `helpers::internal::progress`.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable streaming of child process output and extra detail lines
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print an action header (blue, bold)
/// Example: "==> Installing yarrharr 2.4.2"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a sub-action (cyan arrow)
/// Example: "  -> configure"
pub fn sub_action(phase: &str) {
    println!("  {} {}", "->".cyan(), phase);
}

/// Print a detail line (dimmed prefix)
/// Example: "     downloading https://..."
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a detail line only in verbose mode
pub fn verbose(message: &str) {
    if is_verbose() {
        detail(message);
    }
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a skip message (dimmed)
/// Example: "==> yarrharr-2.4.2.tar.gz already downloaded"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Print a key/value line in info output
pub fn field(key: &str, value: &str) {
    println!("  {:<12} {}", format!("{}:", key).bold(), value);
}

/// Print a dependency line with its resolution status
pub fn dep_item(name: &str, kind: &str, found: bool) {
    if found {
        println!("  {} {} {}", "✓".green(), name.green(), kind.dimmed());
    } else {
        println!("  {} {} {}", "✗".red(), name.red(), kind.dimmed());
    }
}
