//! Internal utility modules
//!
//! Shared functionality used by the phase helpers.

pub mod cmd;
pub mod fs_utils;
pub mod hash;
pub mod progress;
pub mod url_utils;
