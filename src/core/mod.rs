//! Core infrastructure for formula execution
//!
//! Formula parsing, configuration, dependency resolution and the install
//! sequence itself. Step implementations live in [`crate::helpers`].

pub mod config;
pub mod deps;
pub mod error;
pub mod formula;
pub mod installer;
pub mod lock;
pub mod output;

pub use config::Config;
pub use deps::{Detection, Resolution, Resolver};
pub use error::{InstallError, Result};
pub use formula::{Dependency, DependencyKind, Formula};
pub use installer::{InstallOptions, InstallReport, Installer};
